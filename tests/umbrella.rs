//! Umbrella crate wiring: configuration to first classification through the prelude

use std::sync::Arc;

use image::{DynamicImage, Rgb, RgbImage};
use imageclass::prelude::*;

#[tokio::test]
async fn test_default_config_classifies_through_prelude() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("labels")).unwrap();
    let labels: String = (0..1001).map(|i| format!("class {}\n", i)).collect();
    std::fs::write(root.path().join("labels/labels1001.txt"), labels).unwrap();

    let mut config = ImageClassConfig::default();
    config.model.name = Some("mobilenet".to_string());
    config.labels.dir = root.path().to_path_buf();
    validate_config(&config).unwrap();

    let settings = PipelineSettings::from_config(&config).unwrap();
    let runtime: Arc<dyn InferenceRuntime> = Arc::new(ReferenceRuntime::new());
    let registry = Arc::new(BuiltinModelRegistry::new(runtime.clone()));
    let store = Arc::new(CachedLabelStore::new(FileLabelStore::new(&config.labels.dir)));
    let manager = SessionLifecycleManager::new(registry, store, runtime);
    let mut pipeline = ClassificationPipeline::new(manager, Arc::new(TracingPresenter), settings);

    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 24, Rgb([200, 40, 90])));
    pipeline.set_image(image).await.unwrap();

    let manager = pipeline.manager();
    let manager = manager.lock().await;
    let classes = manager.top_classes().unwrap();
    assert!(classes[0].probability >= classes[1].probability);
    assert!(classes[1].probability >= classes[2].probability);
    assert!(classes.iter().all(|c| c.label.starts_with("class ")));
}
