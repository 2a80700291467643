// src/model/template.rs

//! Apply one task template to many target roles.

use crate::task::Task;

/// One independent copy of `template` per role, each with a fresh identity,
/// the role bound and the name suffixed `@role`.
pub fn expand_for_roles<S: AsRef<str>>(template: &dyn Task, roles: &[S]) -> Vec<Box<dyn Task>> {
    roles
        .iter()
        .map(|role| {
            let mut copy = template.clone_boxed();
            copy.core_mut().bind_role(role.as_ref());
            copy
        })
        .collect()
}
