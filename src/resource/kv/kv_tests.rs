use super::*;

#[test]
fn combined_identifier_joins_storage_and_path() {
    assert_eq!(combined_identifier(1, "/a.txt"), "1:/a.txt");
    assert_eq!(combined_identifier(0, "/x/y.png"), "0:/x/y.png");
}

#[test]
fn keys_are_namespaced() {
    assert_eq!(Keys::index("1:/a.txt"), "fal.index::1:/a.txt");
    assert_eq!(Keys::metadata(7), "fal.metadata::7");
    assert_eq!(Keys::blob("/a.txt"), "fal.blob::/a.txt");
}

#[test]
fn checksum_is_fixed_width_and_stable() {
    let a = checksum_for("1:/a.txt", "text/plain", "secret");
    assert_eq!(a.len(), 32);
    assert_eq!(a, checksum_for("1:/a.txt", "text/plain", "secret"));
}

#[test]
fn checksum_changes_with_each_input() {
    let base = checksum_for("1:/a.txt", "text/plain", "secret");
    assert_ne!(base, checksum_for("2:/a.txt", "text/plain", "secret"));
    assert_ne!(base, checksum_for("1:/a.txt", "image/png", "secret"));
    assert_ne!(base, checksum_for("1:/a.txt", "text/plain", "other"));
}

#[test]
fn checksum_has_no_collisions_in_sample() {
    let mut seen = std::collections::HashSet::new();
    for i in 0..2000 {
        let id = combined_identifier(1, &format!("/folder/file_{i}.txt"));
        assert!(seen.insert(checksum_for(&id, "text/plain", "k")));
    }
}
