use assert_matches::assert_matches;

use nuccore_fetch::domain::{DownloadPlan, NuccoreAccession, is_valid_accession};
use nuccore_fetch::error::NuccoreError;

#[test]
fn well_formed_accessions_are_valid() {
    for acc in [
        "NC_000001.11",
        "NC_000001",
        "NM_001256799.3",
        "NR_046018.2",
        "XM_011541469.2",
        "NZ_CP009072.1",
        "NZ_CP01234567.1",
        "NZ_ABCD01000001",
        "U12345",
        "AF123456.1",
        "MN908947.3",
        "OQ12345678",
        "AAAA01000001",
        "ABCDEF010000001",
        "AAAAA1234567",
        "nc_045512.2",
    ] {
        assert!(is_valid_accession(acc), "{acc} should be valid");
    }
}

#[test]
fn malformed_accessions_are_invalid() {
    for acc in [
        "",
        "   ",
        "bad_id",
        "ZZ_000001",
        "NC_ABC123",
        "NC_000001.",
        "NC_000001.x",
        "123456",
        "U1234",
        "AF12345X",
        "NC_000001.11;rm",
        "GCF_000005845.2",
    ] {
        assert!(!is_valid_accession(acc), "{acc:?} should be invalid");
    }
}

#[test]
fn parse_normalizes_case_and_whitespace() {
    let acc: NuccoreAccession = "  af123456.1\n".parse().unwrap();
    assert_eq!(acc.as_str(), "AF123456.1");
}

#[test]
fn parse_error_keeps_raw_input() {
    let err = "NC_ABC".parse::<NuccoreAccession>().unwrap_err();
    assert_matches!(err, NuccoreError::InvalidAccession(raw) if raw == "NC_ABC");
}

#[test]
fn plan_drops_duplicates() {
    let plan = DownloadPlan::new(["NC_000001.11", "bad_id", "NC_000001.11"]).unwrap();
    assert_eq!(plan.entries().len(), 2);
    assert_eq!(plan.accessions(), vec!["NC_000001.11", "BAD_ID"]);
}
