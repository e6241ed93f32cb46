/*!
 * Pipe integration tests
 * Endpoint discipline, predicted buffers, EOF, and backpressure
 */

use adaptive_ipc::{IpcManager, PipeError, SchedulingClass};

fn setup() -> IpcManager {
    let _ = env_logger::builder().is_test(true).try_init();
    IpcManager::new()
}

#[test]
fn test_round_trip_through_ends() {
    let ipc = setup();
    let ends = ipc.pipes().create(1, 2).unwrap();

    ipc.pipes().write(ends.id, 2, b"through the pipe").unwrap();
    let data = ipc.pipes().read(ends.id, 1, 64).unwrap();
    assert_eq!(data, b"through the pipe");
}

#[test]
fn test_create_returns_both_ends() {
    let ipc = setup();
    let ends = ipc.pipes().create(1, 2).unwrap();
    assert_ne!(ends.read_fd, ends.write_fd);
}

#[test]
fn test_predicted_capacity_tracks_footprint() {
    let ipc = setup();
    ipc.processes().register(5, "bulk", SchedulingClass::Normal);
    ipc.processes()
        .set_memory_footprint(5, 128 * 1024 * 1024);

    let small = ipc.pipes().create(1, 2).unwrap();
    let large = ipc.pipes().create(1, 5).unwrap();

    let small_cap = ipc.pipes().stats(small.id).unwrap().capacity;
    let large_cap = ipc.pipes().stats(large.id).unwrap().capacity;
    assert!(large_cap > small_cap);
}

#[test]
fn test_backpressure_when_buffer_full() {
    let ipc = setup();
    let ends = ipc.pipes().create(1, 2).unwrap();
    let capacity = ipc.pipes().stats(ends.id).unwrap().capacity;

    // Fill the buffer exactly; writes report partial progress, never block
    let mut written = 0;
    while written < capacity {
        written += ipc
            .pipes()
            .write(ends.id, 2, &vec![0u8; capacity - written])
            .unwrap();
    }

    assert!(matches!(
        ipc.pipes().write(ends.id, 2, b"overflow"),
        Err(PipeError::Full(_))
    ));

    // Draining restores space
    ipc.pipes().read(ends.id, 1, 1024).unwrap();
    assert!(ipc.pipes().write(ends.id, 2, b"fits again").is_ok());
}

#[test]
fn test_eof_after_close_and_drain() {
    let ipc = setup();
    let ends = ipc.pipes().create(1, 2).unwrap();

    ipc.pipes().write(ends.id, 2, b"last words").unwrap();
    ipc.pipes().close(ends.id, 2).unwrap();

    // Writes fail once closed; buffered bytes still drain, then EOF
    assert!(matches!(
        ipc.pipes().write(ends.id, 2, b"more"),
        Err(PipeError::Closed(_))
    ));
    assert_eq!(ipc.pipes().read(ends.id, 1, 64).unwrap(), b"last words");
    assert_eq!(ipc.pipes().read(ends.id, 1, 64).unwrap(), Vec::<u8>::new());
}

#[test]
fn test_end_discipline_enforced() {
    let ipc = setup();
    let ends = ipc.pipes().create(1, 2).unwrap();

    assert!(matches!(
        ipc.pipes().write(ends.id, 1, b"x"),
        Err(PipeError::WrongEnd { .. })
    ));
    assert!(matches!(
        ipc.pipes().close(ends.id, 3),
        Err(PipeError::WrongEnd { .. })
    ));
}

#[test]
fn test_destroy_reclaims_backing_memory() {
    let ipc = setup();
    let before = ipc.global_memory_usage();

    let ends = ipc.pipes().create(1, 2).unwrap();
    assert!(ipc.global_memory_usage() > before);

    ipc.pipes().destroy(ends.id).unwrap();
    assert_eq!(ipc.global_memory_usage(), before);
}
