//! Process-wide GS factory registry.
//!
//! Registration is an explicit function call rather than a
//! static-initializer/linker-section trick (the `inventory`/`ctor`
//! pattern) — callers (including test doubles registering fakes) call
//! [`register_factory`] themselves, so nothing depends on
//! initialization order.

use std::sync::OnceLock;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::errors::{Result, WeaveError};

use super::GraphicsSystem;

type CreateFn = Box<dyn Fn() -> Box<dyn GraphicsSystem> + Send + Sync>;

fn registry() -> &'static Mutex<FxHashMap<String, CreateFn>> {
    static REGISTRY: OnceLock<Mutex<FxHashMap<String, CreateFn>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(FxHashMap::default()))
}

/// Registers `create_fn` under `script_name`, lowercased. Re-registering
/// the same name overwrites the previous factory — convenient for
/// tests that swap in a fake for one run.
pub fn register_factory(
    script_name: &str,
    create_fn: impl Fn() -> Box<dyn GraphicsSystem> + Send + Sync + 'static,
) {
    registry()
        .lock()
        .insert(script_name.to_lowercase(), Box::new(create_fn));
}

/// Looks up and invokes the factory for `script_name` (case-insensitive).
pub fn create_by_script_name(script_name: &str) -> Result<Box<dyn GraphicsSystem>> {
    let lowered = script_name.to_lowercase();
    let guard = registry().lock();
    let create_fn = guard
        .get(&lowered)
        .ok_or_else(|| WeaveError::UnknownGraphicsSystem(script_name.to_string()))?;
    Ok(create_fn())
}

#[must_use]
pub fn registered_script_names() -> Vec<String> {
    registry().lock().keys().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics_system::RuntimeBindings;

    struct Fake;
    impl GraphicsSystem for Fake {
        fn script_name(&self) -> &'static str {
            "fake"
        }
        fn runtime_bindings(&mut self) -> RuntimeBindings {
            RuntimeBindings::default()
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        register_factory("FakeSystemForLookupTest", || Box::new(Fake));
        assert!(create_by_script_name("fakesystemforlookuptest").is_ok());
        assert!(create_by_script_name("FAKESYSTEMFORLOOKUPTEST").is_ok());
    }

    #[test]
    fn unknown_name_is_an_error() {
        assert!(matches!(
            create_by_script_name("definitely-not-registered"),
            Err(WeaveError::UnknownGraphicsSystem(_))
        ));
    }
}
