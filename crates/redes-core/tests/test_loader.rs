//! CSV loading and cleaning integration tests.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use redes_core::config::NO_CPF;
use redes_core::data::loader::{load_grants, stream_payments};
use redes_core::error::PipelineError;

// ===========================================================================
// Grants
// ===========================================================================

#[test]
fn grants_fixture_row_accounting() {
    let (records, report) = fixture_grants();
    assert_eq!(report.files, 1);
    assert_eq!(report.rows_read, 12);
    assert_eq!(report.rows_kept, 8);
    assert_eq!(records.len(), 8);
    assert_eq!(report.rows_skipped(), 4);
    assert_eq!(report.rows_read, report.rows_kept + report.rows_skipped());
}

#[test]
fn grants_fixture_skip_reasons() {
    let (_, report) = fixture_grants();
    let reasons: Vec<(&str, usize)> = report
        .skipped
        .iter()
        .map(|(k, v)| (k.as_str(), *v))
        .collect();
    assert_eq!(
        reasons,
        vec![
            ("invalid value", 1),
            ("missing agency", 1),
            ("missing recipient", 1),
            ("negative value", 1),
        ]
    );
}

#[test]
fn grants_names_are_canonical() {
    let (records, _) = fixture_grants();
    // "Ministerio da  Saude" / "Prefeitura de Itabuna" on line 2
    let second = records.iter().find(|r| r.line == 2).unwrap();
    assert_eq!(second.agency, "MINISTERIO DA SAUDE");
    assert_eq!(second.recipient, "PREFEITURA DE ITABUNA");
    assert_eq!(second.value, 50.0);
}

#[test]
fn grants_brazilian_amounts_parsed() {
    let (records, _) = fixture_grants();
    let salvador = records
        .iter()
        .find(|r| r.number.as_deref() == Some("700005"))
        .unwrap();
    assert_eq!(salvador.value, 2500.5);
    assert_eq!(salvador.released, 1000.0);
    assert_eq!(salvador.uf, "BA");
    assert!(salvador.published.is_some());
}

#[test]
fn grants_missing_column_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(
        dir.path(),
        "bad.csv",
        "NOME ÓRGÃO CONCEDENTE;VALOR CONVÊNIO\nMS;10,00\n",
    );
    match load_grants(&path, b';') {
        Err(PipelineError::MissingColumn { column, .. }) => {
            assert_eq!(column, "NOME CONVENENTE")
        }
        other => panic!("expected missing column, got {other:?}"),
    }
}

#[test]
fn grants_without_usable_rows_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(
        dir.path(),
        "empty.csv",
        "NOME ÓRGÃO CONCEDENTE;NOME CONVENENTE;VALOR CONVÊNIO\n;;\nMS;X;abc\n",
    );
    assert!(matches!(
        load_grants(&path, b';'),
        Err(PipelineError::EmptyDataset { .. })
    ));
}

#[test]
fn grants_directory_input_reads_every_csv() {
    let dir = tempfile::tempdir().unwrap();
    let header = "NOME ÓRGÃO CONCEDENTE;NOME CONVENENTE;VALOR CONVÊNIO\n";
    write_csv(dir.path(), "a.csv", &format!("{header}MS;P1;10,00\n"));
    write_csv(dir.path(), "b.csv", &format!("{header}MEC;P2;20,00\nMEC;P3;30,00\n"));
    write_csv(dir.path(), "notes.txt", "ignored");

    let (records, report) = load_grants(dir.path(), b';').unwrap();
    assert_eq!(report.files, 2);
    assert_eq!(records.len(), 3);
    assert_eq!(records.iter().map(|r| r.value).sum::<f64>(), 60.0);
}

#[test]
fn missing_input_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_grants(&dir.path().join("nope.csv"), b';');
    assert!(matches!(result, Err(PipelineError::Io { .. })));
}

// ===========================================================================
// Payments
// ===========================================================================

#[test]
fn payments_fixture_row_accounting() {
    let (summary, report) = fixture_payments();
    assert_eq!(report.rows_read, 17);
    assert_eq!(report.rows_kept, 12);
    assert_eq!(summary.records, 12);
    assert_eq!(report.rows_read, report.rows_kept + report.rows_skipped());
}

#[test]
fn payments_fixture_skip_reasons() {
    let (_, report) = fixture_payments();
    for reason in [
        "duplicate row",
        "invalid value",
        "missing beneficiary",
        "missing municipality",
        "non-positive value",
    ] {
        assert_eq!(report.skipped.get(reason), Some(&1), "reason {reason}");
    }
}

#[test]
fn payments_are_streamed_in_file_order() {
    let mut lines = Vec::new();
    stream_payments(&fixture_path("payments.csv"), b';', |r| lines.push(r.line)).unwrap();
    let mut sorted = lines.clone();
    sorted.sort_unstable();
    assert_eq!(lines, sorted);
    assert_eq!(lines.len(), 12);
}

#[test]
fn payments_missing_cpf_uses_placeholder() {
    let mut records = Vec::new();
    stream_payments(&fixture_path("payments.csv"), b';', |r| records.push(r)).unwrap();
    let jose = records.iter().find(|r| r.beneficiary == "JOSE SANTOS").unwrap();
    assert_eq!(jose.cpf, NO_CPF);
    assert!(!jose.has_cpf());
    assert_eq!(jose.competence.as_deref(), Some("202302"));
}

#[test]
fn payments_aggregate_per_municipality() {
    let (summary, _) = fixture_payments();
    assert_eq!(summary.municipalities.len(), 5);
    assert_eq!(summary.unique_beneficiaries, 12);
    assert_eq!(summary.with_cpf, 9);
    assert!(approx_eq(summary.values.total, 8350.0));
    assert_eq!(summary.period.as_deref(), Some("202302"));

    let itabuna = summary
        .municipalities
        .iter()
        .find(|m| m.code == "3515")
        .unwrap();
    assert_eq!(itabuna.name, "ITABUNA");
    assert_eq!(itabuna.installments, 3);
    assert_eq!(itabuna.unique_beneficiaries, 3);
    assert!(approx_eq(itabuna.value_total, 1950.0));
    assert!(approx_eq(itabuna.value_mean, 650.0));
    assert!(approx_eq(itabuna.value_per_capita, 650.0));

    let top: Vec<&str> = summary
        .top_municipalities(2)
        .iter()
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(top, vec!["SALVADOR", "ITABUNA"]);
}

#[test]
fn payments_uf_totals() {
    let (summary, _) = fixture_payments();
    let ufs: Vec<(&str, usize)> = summary
        .ufs
        .iter()
        .map(|u| (u.uf.as_str(), u.records))
        .collect();
    assert_eq!(ufs, vec![("BA", 8), ("PE", 4)]);
    let stats = summary.descriptive();
    assert_eq!(stats.general.municipalities, 5);
    assert_eq!(stats.identification.nis_only, 3);
}
