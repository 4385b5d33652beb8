use super::*;
use crate::comm::thread_group::ThreadGroup;

#[test]
fn broadcast_delivers_root_bits_to_every_rank() {
    let value = 1234.567_890_123_f64.next_up();
    let got = ThreadGroup::run(5, |comm| {
        let mine = if comm.is_coordinator() { value } else { -1.0 };
        comm.broadcast_f64(Rank::COORDINATOR, mine).unwrap()
    })
    .unwrap();
    assert!(got.iter().all(|v| v.to_bits() == value.to_bits()));
}

#[test]
fn broadcast_from_non_zero_root() {
    let got = ThreadGroup::run(3, |comm| {
        let mine = comm.rank().0 as f64 * 10.0;
        comm.broadcast_f64(Rank(2), mine).unwrap()
    })
    .unwrap();
    assert_eq!(got, vec![20.0, 20.0, 20.0]);
}

#[test]
fn all_reduce_or_combines_votes() {
    let got = ThreadGroup::run(4, |comm| comm.all_reduce_or(comm.rank() == Rank(3)).unwrap())
        .unwrap();
    assert_eq!(got, vec![true; 4]);

    let got = ThreadGroup::run(4, |comm| comm.all_reduce_or(false).unwrap()).unwrap();
    assert_eq!(got, vec![false; 4]);
}

#[test]
fn single_rank_group_collectives_are_local() {
    let got = ThreadGroup::run(1, |comm| {
        comm.barrier().unwrap();
        (
            comm.broadcast_f64(Rank::COORDINATOR, 2.5).unwrap(),
            comm.all_reduce_or(true).unwrap(),
        )
    })
    .unwrap();
    assert_eq!(got, vec![(2.5, true)]);
}

#[test]
fn point_to_point_preserves_order() {
    let got = ThreadGroup::run(2, |comm| {
        if comm.rank() == Rank(1) {
            for i in 0..5 {
                comm.send(Rank(0), Message::Time(f64::from(i))).unwrap();
            }
            Vec::new()
        } else {
            (0..5)
                .map(|_| match comm.recv(Rank(1)).unwrap() {
                    Message::Time(v) => v,
                    other => panic!("unexpected {other:?}"),
                })
                .collect()
        }
    })
    .unwrap();
    assert_eq!(got[0], vec![0.0, 1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn mismatched_message_kind_is_reported_as_divergence() {
    let got = ThreadGroup::run(2, |comm| {
        if comm.is_coordinator() {
            comm.send(Rank(1), Message::Flag(true)).unwrap();
            None
        } else {
            Some(comm.broadcast_f64(Rank::COORDINATOR, 0.0))
        }
    })
    .unwrap();
    let err = got[1].as_ref().unwrap().as_ref().unwrap_err();
    assert!(err.to_string().contains("diverged"));
}

#[test]
fn out_of_range_peer_is_rejected() {
    let comms = ThreadGroup::connect(2).unwrap();
    assert!(comms[0].send(Rank(7), Message::Flag(true)).is_err());
    assert!(ThreadGroup::connect(0).is_err());
}

#[test]
fn lent_image_comes_back_to_the_lender() {
    use crate::foundation::core::Rgba;

    let got = ThreadGroup::run(2, |comm| {
        if comm.is_coordinator() {
            let mut img = comm.recv_image(Rank(1)).unwrap();
            let seen = img.pixel(0, 0).unwrap();
            img.set_pixel(0, 0, [1, 2, 3, 4], 0.25);
            comm.send_image(Rank(1), img).unwrap();
            seen
        } else {
            let mut img = ImageBuffer::new(2, 2, Rgba::light_gray());
            img.set_pixel(0, 0, [9, 9, 9, 255], 0.5);
            let back = comm.lend_image(Rank(0), img).unwrap();
            back.pixel(0, 0).unwrap()
        }
    })
    .unwrap();
    assert_eq!(got[0], ([9, 9, 9, 255], 0.5));
    assert_eq!(got[1], ([1, 2, 3, 4], 0.25));
}
