use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        CompositeError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        CompositeError::collective("x")
            .to_string()
            .contains("collective error:")
    );
    assert!(
        CompositeError::render("x")
            .to_string()
            .contains("render error:")
    );
}

#[test]
fn io_and_other_preserve_source() {
    let err = CompositeError::from(std::io::Error::other("disk full"));
    assert!(err.to_string().contains("disk full"));

    let base = std::io::Error::other("boom");
    let err = CompositeError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
