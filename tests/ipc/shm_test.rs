/*!
 * Shared memory integration tests
 * Reference counting, data visibility, and retention hints
 */

use adaptive_ipc::{IpcManager, PredictionHint, ShmError};
use pretty_assertions::assert_eq;

fn setup() -> IpcManager {
    let _ = env_logger::builder().is_test(true).try_init();
    IpcManager::new()
}

#[test]
fn test_attach_detach_lifecycle() {
    let ipc = setup();
    let segment_id = ipc.shm().create(4096, 1).unwrap();

    // Two attaches, two detaches, backing store released at zero
    ipc.shm().attach(segment_id, 1).unwrap();
    ipc.shm().attach(segment_id, 2).unwrap();
    assert_eq!(ipc.shm().stats(segment_id).unwrap().ref_count, 2);

    ipc.shm().detach(segment_id, 1).unwrap();
    assert_eq!(ipc.shm().stats(segment_id).unwrap().ref_count, 1);
    assert!(ipc.global_memory_usage() > 0);

    ipc.shm().detach(segment_id, 2).unwrap();
    assert_eq!(ipc.global_memory_usage(), 0);

    // Third detach: the handle is gone, not silently ignored
    assert!(matches!(
        ipc.shm().detach(segment_id, 2),
        Err(ShmError::NotFound(_))
    ));
}

#[test]
fn test_detach_at_zero_is_an_error() {
    let ipc = setup();
    let segment_id = ipc.shm().create(1024, 1).unwrap();

    assert!(matches!(
        ipc.shm().detach(segment_id, 1),
        Err(ShmError::NotAttached { .. })
    ));
    // The segment itself is untouched by the failed detach
    assert!(ipc.shm().stats(segment_id).is_ok());
}

#[test]
fn test_data_visible_across_attachments() {
    let ipc = setup();
    let segment_id = ipc.shm().create(4096, 1).unwrap();
    ipc.shm().attach(segment_id, 1).unwrap();
    ipc.shm().attach(segment_id, 2).unwrap();

    ipc.shm().write(segment_id, 1, 256, b"shared data").unwrap();
    let read = ipc.shm().read(segment_id, 2, 256, 11).unwrap();
    assert_eq!(read, b"shared data");
}

#[test]
fn test_attachment_token_describes_segment() {
    let ipc = setup();
    let segment_id = ipc.shm().create(8192, 1).unwrap();

    let mapped = ipc.shm().attach(segment_id, 3).unwrap();
    assert_eq!(mapped.id, segment_id);
    assert_eq!(mapped.size, 8192);
}

#[test]
fn test_prediction_hint_is_advisory() {
    let ipc = setup();
    let segment_id = ipc.shm().create(4096, 1).unwrap();
    ipc.shm().attach(segment_id, 1).unwrap();

    // A cold segment is an eviction candidate
    assert_eq!(
        ipc.shm().predict_access(segment_id).unwrap(),
        PredictionHint::Evict
    );

    for offset in (0..4096).step_by(32) {
        ipc.shm().write(segment_id, 1, offset, b"x").unwrap();
    }
    assert_eq!(
        ipc.shm().predict_access(segment_id).unwrap(),
        PredictionHint::Retain
    );

    // The hint freed nothing: the segment still serves reads
    assert!(ipc.shm().read(segment_id, 1, 0, 16).is_ok());
}

#[test]
fn test_size_limit_enforced() {
    let ipc = setup();
    assert!(matches!(
        ipc.shm().create(17 * 1024 * 1024, 1),
        Err(ShmError::SizeExceeded { .. })
    ));
}

#[test]
fn test_unattached_pid_cannot_touch_data() {
    let ipc = setup();
    let segment_id = ipc.shm().create(4096, 1).unwrap();
    ipc.shm().attach(segment_id, 1).unwrap();

    assert!(matches!(
        ipc.shm().read(segment_id, 9, 0, 16),
        Err(ShmError::NotAttached { .. })
    ));
}
