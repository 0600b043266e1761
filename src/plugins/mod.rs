//! Built-in language plugins

pub mod csharp;

use crate::plugin::Plugin;
use std::sync::Arc;

/// Every plugin shipped with mender
pub fn builtin_plugins() -> Vec<Arc<dyn Plugin>> {
    vec![Arc::new(csharp::CSharpPlugin::new())]
}
