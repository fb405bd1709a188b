//! Build executor: parses and drives a recipe against a staging rootfs,
//! materializing one layer per instruction and publishing the result as a
//! new image.

mod config;
mod copy;
mod error;
mod executor;
mod run;

pub use error::{Error, Result};
pub use executor::BuildExecutor;

#[cfg(test)]
mod tests {
    use super::*;
    use hold_store::{Catalog, LayerStore};
    use std::fs;

    fn scratch_dir(label: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "hold-build-test-{label}-{}-{:?}",
            std::process::id(),
            std::time::SystemTime::now()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn scratch_only_build_produces_one_layer_and_empty_config() {
        let root = scratch_dir("scratch-only");
        let layers = LayerStore::open(&root).unwrap();
        let catalog = Catalog::open(&root).unwrap();
        let executor = BuildExecutor::new(&layers, &catalog);

        let recipe = hold_recipe::parse("FROM scratch\n").unwrap();
        let staging = root.join("staging");
        fs::create_dir_all(&staging).unwrap();
        let context = root.join("context");
        fs::create_dir_all(&context).unwrap();

        let image = executor
            .execute(&recipe, &context, &staging, "demo", None)
            .unwrap();
        assert_eq!(image.layers.len(), 1);
        assert!(image.config.cmd.is_empty());
        assert!(image.config.env.is_empty());
    }

    #[test]
    fn env_and_copy_accumulate_into_config_and_staging() {
        let root = scratch_dir("env-copy");
        let layers = LayerStore::open(&root).unwrap();
        let catalog = Catalog::open(&root).unwrap();
        let executor = BuildExecutor::new(&layers, &catalog);

        let context = root.join("context");
        fs::create_dir_all(&context).unwrap();
        fs::write(context.join("app.sh"), b"#!/bin/sh\necho hi\n").unwrap();

        let recipe = hold_recipe::parse(
            "FROM scratch\nENV GREETING=hi\nCOPY app.sh /app.sh\nCMD [\"/app.sh\"]\n",
        )
        .unwrap();
        let staging = root.join("staging");
        fs::create_dir_all(&staging).unwrap();

        let image = executor
            .execute(&recipe, &context, &staging, "demo", Some("v1"))
            .unwrap();

        assert_eq!(image.tag, "v1");
        assert_eq!(image.config.env, vec!["GREETING=hi".to_owned()]);
        assert_eq!(image.config.cmd, vec!["/app.sh".to_owned()]);
        assert!(staging.join("app.sh").is_file());
        // FROM + ENV + COPY + CMD = 4 layers.
        assert_eq!(image.layers.len(), 4);
    }

    #[test]
    fn missing_base_image_is_not_found() {
        let root = scratch_dir("missing-base");
        let layers = LayerStore::open(&root).unwrap();
        let catalog = Catalog::open(&root).unwrap();
        let executor = BuildExecutor::new(&layers, &catalog);

        let recipe = hold_recipe::parse("FROM nonexistent:latest\n").unwrap();
        let staging = root.join("staging");
        fs::create_dir_all(&staging).unwrap();
        let context = root.join("context");
        fs::create_dir_all(&context).unwrap();

        let err = executor
            .execute(&recipe, &context, &staging, "demo", None)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
