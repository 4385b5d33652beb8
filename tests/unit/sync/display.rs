use super::*;
use crate::comm::ThreadGroup;
use crate::foundation::core::Rgba;

#[derive(Default)]
struct Recording {
    calls: Vec<&'static str>,
}

impl Presenter for Recording {
    fn upload(&mut self, _frame: u64, _image: &CompositeImage) -> CompositeResult<()> {
        self.calls.push("upload");
        Ok(())
    }

    fn swap(&mut self) -> CompositeResult<()> {
        self.calls.push("swap");
        Ok(())
    }
}

#[test]
fn only_the_coordinator_presents() {
    let img = ImageBuffer::new(2, 2, Rgba::light_gray());
    let got = ThreadGroup::run(3, |comm| {
        let mut display = DisplaySync::new(Recording::default());
        for frame in 0..2 {
            let composite = comm.is_coordinator().then_some(&img);
            display.end_frame(&comm, frame, composite).unwrap();
        }
        (display.presented(), display.into_presenter().calls)
    })
    .unwrap();

    assert_eq!(got[0], (2, vec!["upload", "swap", "upload", "swap"]));
    assert_eq!(got[1], (0, vec![]));
    assert_eq!(got[2], (0, vec![]));
}

#[test]
fn coordinator_without_composite_is_an_error() {
    let got = ThreadGroup::run(1, |comm| {
        DisplaySync::new(NullPresenter).end_frame(&comm, 0, None)
    })
    .unwrap();
    assert!(got[0].is_err());
}

#[test]
fn memory_presenter_records_swapped_frames() {
    let mut p = MemoryPresenter::default();
    let a = ImageBuffer::new(2, 1, Rgba::new(1.0, 0.0, 0.0, 1.0));
    let b = ImageBuffer::new(2, 1, Rgba::new(0.0, 1.0, 0.0, 1.0));
    p.upload(0, &a).unwrap();
    p.swap().unwrap();
    p.upload(1, &b).unwrap();
    p.swap().unwrap();
    assert_eq!(p.history, vec![(0, a.fingerprint()), (1, b.fingerprint())]);
    assert_eq!(p.last.as_ref(), Some(&b));
    assert!(p.swap().is_err());
}

#[test]
fn png_presenter_writes_every_nth_frame() {
    let dir = std::path::PathBuf::from("target").join("png_presenter_unit");
    let _ = std::fs::remove_dir_all(&dir);
    let mut p = PngSequencePresenter::new(&dir, 2).unwrap();
    let img = ImageBuffer::new(3, 2, Rgba::new(0.0, 0.0, 1.0, 1.0));
    for frame in 0..5 {
        p.upload(frame, &img).unwrap();
        p.swap().unwrap();
    }
    let names: Vec<_> = p
        .written()
        .iter()
        .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["frame_00000.png", "frame_00002.png", "frame_00004.png"]
    );

    let back = image::open(dir.join("frame_00002.png")).unwrap().to_rgba8();
    assert_eq!(back.dimensions(), (3, 2));
    assert_eq!(back.get_pixel(2, 1).0, [0, 0, 255, 255]);
    assert!(PngSequencePresenter::new(&dir, 0).is_err());
}
