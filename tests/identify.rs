//! End-to-end coverage of `identify_packer`, built against small synthetic
//! PE byte buffers (no binary fixtures are available in this workspace).

use std::io::Write;

/// Builds a minimal valid PE with one `.text` section covering the given
/// entry-point bytes, and its own raw data starting at file offset 0x200.
fn build_pe(entry_point_bytes: &[u8]) -> Vec<u8> {
    let mut file = vec![0u8; 0x200];
    file[0..2].copy_from_slice(b"MZ");
    file[0x3c..0x40].copy_from_slice(&64u32.to_le_bytes()); // pe_offset = 64

    let pe_offset = 64usize;
    file.resize(pe_offset + 24 + 28 + 40 + 0x200, 0);
    file[pe_offset..pe_offset + 4].copy_from_slice(b"PE\0\0");
    file[pe_offset + 6..pe_offset + 8].copy_from_slice(&1u16.to_le_bytes()); // number_of_sections
    file[pe_offset + 20..pe_offset + 22].copy_from_slice(&28u16.to_le_bytes()); // size_of_opt_header

    let entry_rva = 0x1000u32;
    file[pe_offset + 40..pe_offset + 44].copy_from_slice(&entry_rva.to_le_bytes());

    let section_start = pe_offset + 24 + 28;
    let raw_pointer = (pe_offset + 24 + 28 + 40) as u32;
    file[section_start + 8..section_start + 12].copy_from_slice(&0x2000u32.to_le_bytes()); // virtual_size
    file[section_start + 12..section_start + 16].copy_from_slice(&entry_rva.to_le_bytes()); // virtual_address
    file[section_start + 16..section_start + 20].copy_from_slice(&0x200u32.to_le_bytes()); // raw_size
    file[section_start + 20..section_start + 24].copy_from_slice(&raw_pointer.to_le_bytes());

    let end = raw_pointer as usize + entry_point_bytes.len() + 0x100;
    file.resize(end, 0);
    file[raw_pointer as usize..raw_pointer as usize + entry_point_bytes.len()].copy_from_slice(entry_point_bytes);
    file
}

fn write_temp(bytes: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.exe");
    std::fs::File::create(&path).unwrap().write_all(bytes).unwrap();
    (dir, path)
}

fn write_db(contents: &str, dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("userdb.txt");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn s1_ep_only_signature_is_identified() {
    let pe = build_pe(&[0x60, 0xBE, 0x11, 0x22, 0x33, 0x44, 0x8D, 0xBE, 0x00]);
    let (_exe_dir, exe_path) = write_temp(&pe);
    let db_dir = tempfile::tempdir().unwrap();
    let db = write_db(
        "; 1 signatures in list\n\n[UPX]\nsignature = 60 BE ?? ?? ?? ?? 8D BE\nep_only = true\n\n",
        db_dir.path(),
    );

    let paths = vec![exe_path.to_string_lossy().to_string()];
    let results = peid::identify_packer(&paths, &db, true, false, true).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].1, vec!["UPX".to_string()]);
}

#[test]
fn s2_match_once_returns_the_deepest_match() {
    let pe = build_pe(&[0x60, 0xBE, 0x11, 0x22, 0x33, 0x44, 0x8D, 0xBE, 0x00]);
    let (_exe_dir, exe_path) = write_temp(&pe);
    let db_dir = tempfile::tempdir().unwrap();
    let db = write_db(
        "; 2 signatures in list\n\n[A]\nsignature = 60 BE\nep_only = true\n\n[UPX]\nsignature = 60 BE ?? ?? ?? ?? 8D BE\nep_only = true\n\n",
        db_dir.path(),
    );

    let paths = vec![exe_path.to_string_lossy().to_string()];
    let results = peid::identify_packer(&paths, &db, true, false, false).unwrap();
    assert_eq!(results[0].1, vec!["UPX".to_string()]);
}

#[test]
fn s3_conflicting_scopes_are_rejected_at_parse_time() {
    let db_dir = tempfile::tempdir().unwrap();
    let db = write_db(
        "; 1 signatures in list\n\n[Bad]\nsignature = 60 BE\nep_only = true\nsection_start_only = true\n\n",
        db_dir.path(),
    );
    let err = peid::sigdb::open_trie(&db, false).unwrap_err();
    assert!(matches!(err, peid::Error::DbParse { .. }));
}

#[test]
fn s5_entry_point_outside_sections_yields_empty_match_list() {
    let mut pe = build_pe(&[0x60, 0xBE]);
    // Push the entry point RVA outside the only section's virtual range.
    pe[64 + 40..64 + 44].copy_from_slice(&0x9000u32.to_le_bytes());
    let (_exe_dir, exe_path) = write_temp(&pe);
    let db_dir = tempfile::tempdir().unwrap();
    let db = write_db("; 1 signatures in list\n\n[A]\nsignature = 60 BE\nep_only = true\n\n", db_dir.path());

    let paths = vec![exe_path.to_string_lossy().to_string()];
    let results = peid::identify_packer(&paths, &db, true, false, true).unwrap();
    assert_eq!(results[0].1, Vec::<String>::new());
}

#[test]
fn s6_cached_trie_matches_freshly_built_trie() {
    let pe = build_pe(&[0x60, 0xBE, 0x11, 0x22, 0x33, 0x44, 0x8D, 0xBE, 0x00]);
    let (_exe_dir, exe_path) = write_temp(&pe);
    let db_dir = tempfile::tempdir().unwrap();
    let db = write_db(
        "; 1 signatures in list\n\n[UPX]\nsignature = 60 BE ?? ?? ?? ?? 8D BE\nep_only = true\n\n",
        db_dir.path(),
    );
    let paths = vec![exe_path.to_string_lossy().to_string()];

    let first = peid::identify_packer(&paths, &db, true, false, true).unwrap();
    assert!(peid::sigdb::cache::sidecar_path(&db, false).exists());
    let second = peid::identify_packer(&paths, &db, true, false, true).unwrap();
    assert_eq!(first, second);
}
