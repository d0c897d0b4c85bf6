//! Streaming aggregation of payment rows per municipality, per UF and overall.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::config::{MunicipalityStats, PaymentRecord, UfSummary};
use crate::metrics::stats::{RunningStats, ValueSummary};

fn key_hash(s: &str) -> u64 {
    let mut h = DefaultHasher::new();
    s.hash(&mut h);
    h.finish()
}

#[derive(Debug, Default)]
struct MunicipalityAcc {
    name: String,
    uf: String,
    values: RunningStats,
    beneficiaries: HashSet<u64>,
    with_cpf: usize,
}

#[derive(Debug, Default)]
struct UfAcc {
    values: RunningStats,
    beneficiaries: HashSet<u64>,
}

/// Folds payment records one at a time; only the value column is kept whole.
#[derive(Debug, Default)]
pub struct PaymentAggregator {
    municipalities: HashMap<String, MunicipalityAcc>,
    ufs: HashMap<String, UfAcc>,
    values: Vec<f64>,
    beneficiaries: HashSet<u64>,
    with_cpf: usize,
    periods: BTreeMap<String, usize>,
}

impl PaymentAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: PaymentRecord) {
        let nis = key_hash(&record.nis);
        let has_cpf = record.has_cpf();

        let muni = self
            .municipalities
            .entry(record.municipality_code)
            .or_insert_with(|| MunicipalityAcc {
                name: record.municipality,
                uf: record.uf.clone(),
                ..Default::default()
            });
        muni.values.push(record.value);
        muni.beneficiaries.insert(nis);
        if has_cpf {
            muni.with_cpf += 1;
        }

        let uf = self.ufs.entry(record.uf).or_default();
        uf.values.push(record.value);
        uf.beneficiaries.insert(nis);

        self.values.push(record.value);
        self.beneficiaries.insert(nis);
        if has_cpf {
            self.with_cpf += 1;
        }
        if let Some(period) = record.competence {
            *self.periods.entry(period).or_insert(0) += 1;
        }
    }

    pub fn records(&self) -> usize {
        self.values.len()
    }

    /// Close the aggregation. Municipalities are ordered by code, UFs by name.
    pub fn finish(mut self) -> PaymentSummary {
        let mut municipalities: Vec<MunicipalityStats> = self
            .municipalities
            .into_iter()
            .map(|(code, acc)| {
                let unique = acc.beneficiaries.len();
                let total = acc.values.sum();
                MunicipalityStats {
                    code,
                    name: acc.name,
                    uf: acc.uf,
                    value_mean: finite_or_zero(acc.values.mean()),
                    value_std: finite_or_zero(acc.values.std()),
                    value_total: total,
                    installments: acc.values.count(),
                    unique_beneficiaries: unique,
                    with_cpf: acc.with_cpf,
                    cpf_ratio: ratio(acc.with_cpf as f64, unique),
                    value_per_capita: ratio(total, unique),
                }
            })
            .collect();
        municipalities.sort_by(|a, b| a.code.cmp(&b.code));

        let mut ufs: Vec<UfSummary> = self
            .ufs
            .into_iter()
            .map(|(uf, acc)| UfSummary {
                uf,
                total_value: acc.values.sum(),
                mean_value: acc.values.mean(),
                std_value: acc.values.std(),
                records: acc.values.count(),
                distinct: acc.beneficiaries.len(),
            })
            .collect();
        ufs.sort_by(|a, b| a.uf.cmp(&b.uf));

        // Most frequent competence month names the period
        let period = self
            .periods
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(p, _)| p.clone());

        let records = self.values.len();
        let values = ValueSummary::from_values(&mut self.values);

        PaymentSummary {
            records,
            unique_beneficiaries: self.beneficiaries.len(),
            with_cpf: self.with_cpf,
            period,
            values,
            sorted_values: self.values,
            municipalities,
            ufs,
        }
    }
}

fn ratio(num: f64, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        finite_or_zero(num / den as f64)
    }
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

/// Everything the benefits pipeline needs after the stream is consumed.
#[derive(Debug, Clone)]
pub struct PaymentSummary {
    pub records: usize,
    pub unique_beneficiaries: usize,
    pub with_cpf: usize,
    pub period: Option<String>,
    pub values: ValueSummary,
    /// Installment values in ascending order (histograms).
    pub sorted_values: Vec<f64>,
    pub municipalities: Vec<MunicipalityStats>,
    pub ufs: Vec<UfSummary>,
}

/// `descriptive_stats.json` document.
#[derive(Debug, Clone, Serialize)]
pub struct BenefitStats {
    pub general: GeneralStats,
    pub by_uf: BTreeMap<String, UfSummary>,
    pub percentiles: BTreeMap<String, f64>,
    pub identification: Identification,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneralStats {
    pub records: usize,
    pub municipalities: usize,
    pub unique_beneficiaries: usize,
    pub period: Option<String>,
    pub value_total: f64,
    pub value_mean: f64,
    pub value_median: f64,
    pub value_std: f64,
    pub value_min: f64,
    pub value_max: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Identification {
    pub with_cpf: usize,
    pub with_cpf_percent: f64,
    pub nis_only: usize,
}

impl PaymentSummary {
    pub fn descriptive(&self) -> BenefitStats {
        BenefitStats {
            general: GeneralStats {
                records: self.records,
                municipalities: self.municipalities.len(),
                unique_beneficiaries: self.unique_beneficiaries,
                period: self.period.clone(),
                value_total: self.values.total,
                value_mean: self.values.mean,
                value_median: self.values.median,
                value_std: self.values.std,
                value_min: self.values.min,
                value_max: self.values.max,
            },
            by_uf: self
                .ufs
                .iter()
                .map(|u| (u.uf.clone(), u.clone()))
                .collect(),
            percentiles: self.values.percentiles.clone(),
            identification: Identification {
                with_cpf: self.with_cpf,
                with_cpf_percent: ratio(self.with_cpf as f64 * 100.0, self.records),
                nis_only: self.records - self.with_cpf,
            },
        }
    }

    /// Municipalities ranked by total value, largest first.
    pub fn top_municipalities(&self, n: usize) -> Vec<&MunicipalityStats> {
        let mut ranked: Vec<&MunicipalityStats> = self.municipalities.iter().collect();
        ranked.sort_by(|a, b| {
            b.value_total
                .total_cmp(&a.value_total)
                .then_with(|| a.code.cmp(&b.code))
        });
        ranked.truncate(n);
        ranked
    }
}
