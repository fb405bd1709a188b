//! Container registry and namespace-based lifecycle engine.
//!
//! `Registry` persists container records as one JSON file per id under
//! `{root}/container-metadata/`; `Engine` drives the container state
//! machine and owns the registry plus handles into the image catalog and
//! layer store needed to materialize a rootfs on `create`.

mod cgroup;
mod container;
mod error;
mod exec;
mod lifecycle;
pub mod namespaces;
mod registry;

pub use container::{Container, ResourceLimits, State};
pub use error::{Error, Result};
pub use lifecycle::{CreateSpec, DEFAULT_GRACE_PERIOD, Engine};
pub use registry::Registry;

#[cfg(test)]
mod tests {
    use super::*;
    use hold_store::{Catalog, LayerStore, RuntimeConfig};
    use std::fs;
    use std::path::PathBuf;

    fn scratch_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "hold-engine-test-{label}-{}-{:?}",
            std::process::id(),
            std::time::SystemTime::now()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn seed_scratch_image(root: &std::path::Path, name: &str) {
        let layers = LayerStore::open(root).unwrap();
        let catalog = Catalog::open(root).unwrap();
        let id = layers.create(None, "FROM scratch", None).unwrap();
        catalog
            .create(name, None, vec![id], RuntimeConfig::default())
            .unwrap();
    }

    #[test]
    fn create_resolves_default_command_and_persists_record() {
        let root = scratch_dir("create");
        seed_scratch_image(&root, "demo");
        let engine = Engine::open(&root, root.join("hold-shim")).unwrap();

        let record = engine
            .create(CreateSpec {
                image: "demo".to_owned(),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(record.state, State::Created);
        assert_eq!(record.command, vec!["/bin/sh".to_owned()]);
        assert!(record.rootfs.is_dir());

        let reloaded = engine.registry().load(&record.id).unwrap();
        assert_eq!(reloaded.id, record.id);
    }

    #[test]
    fn create_unknown_image_is_not_found() {
        let root = scratch_dir("create-missing-image");
        let engine = Engine::open(&root, root.join("hold-shim")).unwrap();
        let err = engine
            .create(CreateSpec {
                image: "nonexistent".to_owned(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn remove_running_container_is_conflict() {
        let root = scratch_dir("remove-running");
        seed_scratch_image(&root, "demo");
        let engine = Engine::open(&root, root.join("hold-shim")).unwrap();
        let mut record = engine
            .create(CreateSpec {
                image: "demo".to_owned(),
                ..Default::default()
            })
            .unwrap();
        record.state = State::Running;
        record.pid = Some(1);
        engine.registry().update(&record).unwrap();

        let err = engine.remove(&record.id).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn stop_already_exited_container_is_idempotent() {
        let root = scratch_dir("stop-idempotent");
        seed_scratch_image(&root, "demo");
        let engine = Engine::open(&root, root.join("hold-shim")).unwrap();
        let record = engine
            .create(CreateSpec {
                image: "demo".to_owned(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(record.state, State::Created);
        engine.stop(&record.id, None).unwrap();
    }

    #[test]
    fn remove_deletes_rootfs_and_record() {
        let root = scratch_dir("remove");
        seed_scratch_image(&root, "demo");
        let engine = Engine::open(&root, root.join("hold-shim")).unwrap();
        let record = engine
            .create(CreateSpec {
                image: "demo".to_owned(),
                ..Default::default()
            })
            .unwrap();
        let rootfs = record.rootfs.clone();

        engine.remove(&record.id).unwrap();
        assert!(!rootfs.is_dir());
        assert!(engine.registry().load(&record.id).is_err());
    }

    #[test]
    fn commit_publishes_new_image_from_container_rootfs() {
        let root = scratch_dir("commit");
        seed_scratch_image(&root, "demo");
        let engine = Engine::open(&root, root.join("hold-shim")).unwrap();
        let record = engine
            .create(CreateSpec {
                image: "demo".to_owned(),
                ..Default::default()
            })
            .unwrap();
        fs::write(record.rootfs.join("marker"), b"hi").unwrap();

        let image = engine
            .commit(&record.id, "demo-snapshot", None, Some("checkpoint"))
            .unwrap();

        assert_eq!(image.reference(), "demo-snapshot:latest");
        assert_eq!(image.layers.len(), 1);
        let reloaded = engine.catalog().lookup("demo-snapshot", None).unwrap();
        assert_eq!(reloaded.id, image.id);
    }
}
