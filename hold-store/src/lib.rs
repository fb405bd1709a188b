//! Content-addressed layer store and image catalog.
//!
//! Layout under a state root:
//! ```text
//! {root}/layers/{layer_id}/            — layer contents + sidecar
//! {root}/metadata/{name}:{tag}.json    — image catalog entries
//! ```

mod catalog;
mod error;
mod image;
mod layer;

pub use catalog::Catalog;
pub use error::{Error, Result};
pub use image::{DEFAULT_TAG, Image, RuntimeConfig};
pub use layer::{Layer, LayerStore, generate_id};

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(label: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "hold-store-test-{label}-{}-{:?}",
            std::process::id(),
            std::time::SystemTime::now()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn layer_create_extract_roundtrip() {
        let root = scratch_dir("layer-roundtrip");
        let store = LayerStore::open(&root).unwrap();

        let src = root.join("src");
        fs::create_dir_all(src.join("etc")).unwrap();
        fs::write(src.join("etc/hostname"), b"demo\n").unwrap();

        let id = store.create(None, "FROM scratch", Some(&src)).unwrap();
        let layer = store.get(&id).unwrap();
        assert_eq!(layer.parent, None);
        assert!(layer.size > 0);

        let target = root.join("rootfs");
        store.extract(&id, &target).unwrap();
        assert_eq!(fs::read(target.join("etc/hostname")).unwrap(), b"demo\n");
    }

    #[test]
    fn layer_create_missing_parent_fails() {
        let root = scratch_dir("layer-missing-parent");
        let store = LayerStore::open(&root).unwrap();
        let err = store.create(Some("nonexistent"), "RUN true", None).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn layer_ids_are_unique() {
        let root = scratch_dir("layer-unique-ids");
        let store = LayerStore::open(&root).unwrap();
        let a = store.create(None, "FROM scratch", None).unwrap();
        let b = store.create(None, "FROM scratch", None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn catalog_create_lookup_roundtrip() {
        let root = scratch_dir("catalog-roundtrip");
        let catalog = Catalog::open(&root).unwrap();
        let config = RuntimeConfig {
            cmd: vec!["/bin/sh".into()],
            ..Default::default()
        };
        catalog
            .create("demo", None, vec!["layer1".into()], config)
            .unwrap();

        let found = catalog.lookup("demo", None).unwrap();
        assert_eq!(found.tag, "latest");
        assert_eq!(found.layers, vec!["layer1".to_owned()]);
    }

    #[test]
    fn catalog_lookup_missing_is_not_found() {
        let root = scratch_dir("catalog-missing");
        let catalog = Catalog::open(&root).unwrap();
        let err = catalog.lookup("nope", None).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn catalog_remove_then_lookup_not_found() {
        let root = scratch_dir("catalog-remove");
        let catalog = Catalog::open(&root).unwrap();
        catalog
            .create("demo", None, vec![], RuntimeConfig::default())
            .unwrap();
        catalog.remove("demo:latest").unwrap();
        assert!(catalog.lookup("demo", None).is_err());
    }

    #[test]
    fn catalog_tag_clones_under_new_reference() {
        let root = scratch_dir("catalog-tag");
        let catalog = Catalog::open(&root).unwrap();
        catalog
            .create("demo", None, vec!["layer1".into()], RuntimeConfig::default())
            .unwrap();
        catalog.tag("demo:latest", "demo2", Some("v1")).unwrap();
        let found = catalog.lookup("demo2", Some("v1")).unwrap();
        assert_eq!(found.layers, vec!["layer1".to_owned()]);
    }
}
