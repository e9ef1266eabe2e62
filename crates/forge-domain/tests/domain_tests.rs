use std::fs;

use forge_domain::{DomainError, Entrypoint, GroupDatabase, ImageReference, PasswdDatabase, PasswdEntry,
                   RuntimeIdentity, TreeManifest};

#[test]
fn test_image_reference_pinned_roundtrip() {
    let hex = "a".repeat(64);
    let raw = format!("base/alpine@sha256:{hex}");
    let r = ImageReference::parse(&raw).unwrap();
    assert_eq!(r.name(), "base/alpine");
    assert_eq!(r.digest(), Some(hex.as_str()));
    assert_eq!(r.to_string(), raw);
}

#[test]
fn test_image_reference_rejects_floating_tag() {
    // Una etiqueta flotante no es representable: el build debe ser reproducible
    let err = ImageReference::parse("alpine:latest").unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
    assert!(ImageReference::parse("alpine").is_err());
    assert!(ImageReference::parse("alpine@sha256:zz").is_err());
}

#[test]
fn test_image_reference_scratch() {
    let r = ImageReference::parse("scratch").unwrap();
    assert!(r.is_scratch());
    assert_eq!(r.digest(), None);
}

#[test]
fn test_runtime_identity_privilege_detection() {
    let restricted = RuntimeIdentity::new("proxyadmin", "proxyusers").unwrap();
    assert!(!restricted.is_privileged());
    let elevated = RuntimeIdentity::new("proxyadmin", "wheel").unwrap();
    assert!(elevated.is_privileged());
}

#[test]
fn test_runtime_identity_rejects_bad_names() {
    assert!(RuntimeIdentity::new("9admin", "users").is_err());
    assert!(RuntimeIdentity::new("proxy admin", "users").is_err());
    assert!(RuntimeIdentity::new("proxyadmin", "Users").is_err());
}

#[test]
fn test_entrypoint_requires_absolute_path() {
    assert!(Entrypoint::new("proxy", vec![]).is_err());
    let ep = Entrypoint::new("/usr/local/bin/proxy", vec![]).unwrap();
    assert_eq!(ep.argv(), vec!["/usr/local/bin/proxy".to_string()]);
}

#[test]
fn test_passwd_database_parse_render_roundtrip() {
    let text = "root:x:0:0:root:/root:/bin/sh\ndaemon:x:1:1::/:/sbin/nologin\n";
    let db = PasswdDatabase::parse(text).unwrap();
    assert!(db.contains("root"));
    assert_eq!(db.render(), text);
}

#[test]
fn test_passwd_database_duplicate_account_is_loud() {
    let mut db = PasswdDatabase::parse("root:x:0:0:root:/root:/bin/sh\n").unwrap();
    let entry = PasswdEntry { name: "root".to_string(),
                              uid: 1000,
                              gid: 1000,
                              gecos: String::new(),
                              home: "/".to_string(),
                              shell: "/sbin/nologin".to_string() };
    let err = db.add(entry).unwrap_err();
    assert!(matches!(err, DomainError::DuplicateAccount(_)));
}

#[test]
fn test_passwd_database_uid_allocation_skips_taken() {
    let db = PasswdDatabase::parse("a:x:1000:1000::/:/bin/sh\nb:x:1001:1001::/:/bin/sh\n").unwrap();
    assert_eq!(db.next_free_uid(1000), 1002);
}

#[test]
fn test_group_database_membership() {
    let mut db = GroupDatabase::parse("proxyusers:x:200:\n").unwrap();
    let gid = db.add_member("proxyusers", "proxyadmin").unwrap();
    assert_eq!(gid, 200);
    // Repetir la membresía no duplica al miembro
    db.add_member("proxyusers", "proxyadmin").unwrap();
    assert_eq!(db.render(), "proxyusers:x:200:proxyadmin\n");

    let err = db.add_member("wheel", "proxyadmin").unwrap_err();
    assert!(matches!(err, DomainError::UnknownGroup(_)));
}

#[test]
fn test_tree_manifest_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("etc")).unwrap();
    fs::write(dir.path().join("etc/passwd"), "root:x:0:0:root:/root:/bin/sh\n").unwrap();
    fs::write(dir.path().join("hello"), b"hola").unwrap();

    let m1 = TreeManifest::from_dir(dir.path()).unwrap();
    let m2 = TreeManifest::from_dir(dir.path()).unwrap();
    assert_eq!(m1, m2);
    assert_eq!(m1.root_digest(), m2.root_digest());
    assert!(m1.contains("etc/passwd"));
}

#[test]
fn test_tree_manifest_diff_captures_layer_delta() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a"), b"uno").unwrap();
    let before = TreeManifest::from_dir(dir.path()).unwrap();

    fs::write(dir.path().join("b"), b"dos").unwrap();
    let after = TreeManifest::from_dir(dir.path()).unwrap();

    let diff = after.diff(&before);
    assert_eq!(diff.changed.len(), 1);
    assert!(diff.changed.contains_key("b"));
    assert!(diff.removed.is_empty());
    assert!(!diff.digest().is_empty());

    // Sin cambios, el delta es vacío
    let empty = after.diff(&after);
    assert!(empty.is_empty());
}

#[test]
fn test_tree_manifest_missing_root_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-such");
    let m = TreeManifest::from_dir(&missing).unwrap();
    assert!(m.is_empty());
}
