use std::time::Duration;

use super::*;

fn park_forever() -> ! {
    loop {
        std::thread::park();
    }
}

#[test]
fn panicking_rank_aborts_the_group() {
    let (tx, rx) = crossbeam_channel::unbounded();
    // The group never finishes once aborted, so it runs detached.
    std::thread::spawn(move || {
        let _ = ThreadGroup::run_with_abort_handler(
            3,
            move |rank, code| {
                let _ = tx.send((rank, code));
                park_forever()
            },
            |comm| {
                if comm.rank() == Rank(1) {
                    panic!("hook blew up");
                }
                // The healthy ranks would wait here forever without the abort.
                comm.barrier()
            },
        );
    });

    let (rank, code) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(rank, Rank(1));
    assert_eq!(code, PANIC_EXIT_CODE);
}

#[test]
fn explicit_abort_runs_the_handler_with_its_code() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let comms = ThreadGroup::connect_with_abort_handler(2, move |rank, code| {
        let _ = tx.send((rank, code));
        park_forever()
    })
    .unwrap();
    let comm = comms[0].clone();
    std::thread::spawn(move || {
        comm.abort(3);
    });

    assert_eq!(
        rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        (Rank(0), 3)
    );
}

#[test]
fn healthy_group_never_aborts() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let out = ThreadGroup::run_with_abort_handler(
        3,
        move |rank, code| {
            let _ = tx.send((rank, code));
        },
        |comm| comm.barrier().is_ok(),
    )
    .unwrap();
    assert_eq!(out, vec![true; 3]);
    assert!(rx.try_recv().is_err());
}
