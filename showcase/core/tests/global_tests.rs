//! Process-wide instance tests
//!
//! Kept to a single test: the instance is installed once per process.

use std::sync::Arc;

use showcase_core::test_utils::MockHost;
use showcase_core::{global, EngineConfig, ErrorKind, ShowRequest, Target};

#[tokio::test]
async fn test_install_lifecycle() {
    assert!(!global::is_installed());
    let err = global::show(ShowRequest::new([Target::markup("<p/>")])).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unavailable);
    assert!(err.to_string().starts_with("001 - "));
    assert_eq!(global::instance().unwrap_err().kind, ErrorKind::Unavailable);

    let first = global::install(Arc::new(MockHost::new()), EngineConfig::default()).unwrap();
    let second = global::install(Arc::new(MockHost::new()), EngineConfig::default()).unwrap();
    assert!(std::ptr::eq(first, second));
    assert!(std::ptr::eq(first, global::instance().unwrap()));

    assert!(global::show(ShowRequest::new([Target::markup("<p/>")])).unwrap());
    assert!(first.is_busy());
}
