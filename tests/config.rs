use entity_agent::ecs::BoxedComponent;
use entity_agent::{telemetry, Config, ConfigError, EcsError, Entity, Record};
use tempfile::tempdir;

#[tokio::test]
async fn entity_spawns_from_yaml_config() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("store.yaml");
    std::fs::write(
        &path,
        "store:\n  mailbox_capacity: 4\n  request_timeout_ms: 500\nlogging:\n  level: entity_agent=debug\n",
    )
    .unwrap();

    let config = Config::from_yaml(&path).expect("config should load");
    telemetry::init(&config.logging).expect("logging should initialise");

    let seed: Vec<BoxedComponent> = vec![Box::new(Record::new("hp", 3_i32))];
    let entity = Entity::with_config(&config.store, seed).expect("entity spawns");
    entity.modify("hp", |hp: i32| hp * 3).await.unwrap();
    assert_eq!(entity.get::<i32>("hp").await.unwrap(), 9);
}

#[test]
fn missing_file_is_an_io_error() {
    let temp = tempdir().expect("tempdir");
    let err = Config::from_yaml(temp.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn malformed_yaml_is_rejected() {
    let err = Config::from_yaml_str("store: [1, 2").unwrap_err();
    assert!(matches!(err, ConfigError::Yaml(_)));
}

#[tokio::test]
async fn invalid_store_config_blocks_spawn() {
    let config = Config::from_yaml_str("store:\n  request_timeout_ms: 10\n").unwrap();
    let mut store = config.store;
    store.request_timeout_ms = Some(0);

    let err = Entity::with_config(&store, Vec::new()).unwrap_err();
    assert!(matches!(err, EcsError::Config(ConfigError::Invalid(_))));
}
