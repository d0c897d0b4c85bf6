//! Column layouts of the two exports and row → record conversion.

use std::hash::{Hash, Hasher};

use crate::config::{GrantRecord, PaymentRecord, NO_CPF, NO_NIS, NO_UF};
use crate::data::normalize::{canonical_code, canonical_name, parse_amount, parse_date, parse_month};
use crate::data::source::{Header, Row};
use crate::error::Result;

/// Why a row was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowIssue {
    MissingAgency,
    MissingRecipient,
    MissingBeneficiary,
    MissingMunicipality,
    InvalidValue,
    NegativeValue,
    NonPositiveValue,
    Duplicate,
}

impl RowIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingAgency => "missing agency",
            Self::MissingRecipient => "missing recipient",
            Self::MissingBeneficiary => "missing beneficiary",
            Self::MissingMunicipality => "missing municipality",
            Self::InvalidValue => "invalid value",
            Self::NegativeValue => "negative value",
            Self::NonPositiveValue => "non-positive value",
            Self::Duplicate => "duplicate row",
        }
    }
}

impl std::fmt::Display for RowIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Grants
// ---------------------------------------------------------------------------

/// Column positions in a grants export.
#[derive(Debug, Clone)]
pub struct GrantColumns {
    agency: usize,
    recipient: usize,
    value: usize,
    number: Option<usize>,
    agency_code: Option<usize>,
    recipient_code: Option<usize>,
    released: Option<usize>,
    published: Option<usize>,
    uf: Option<usize>,
    municipality_code: Option<usize>,
}

impl GrantColumns {
    pub fn resolve(header: &Header) -> Result<Self> {
        Ok(Self {
            agency: header.require("NOME ÓRGÃO CONCEDENTE")?,
            recipient: header.require("NOME CONVENENTE")?,
            value: header.require("VALOR CONVÊNIO")?,
            number: header.optional("NÚMERO CONVÊNIO"),
            agency_code: header.optional("CÓDIGO ÓRGÃO CONCEDENTE"),
            recipient_code: header.optional("CÓDIGO CONVENENTE"),
            released: header.optional("VALOR LIBERADO"),
            published: header.optional("DATA PUBLICAÇÃO"),
            uf: header.optional("UF"),
            municipality_code: header.optional("CÓDIGO SIAFI MUNICÍPIO"),
        })
    }

    pub fn parse(&self, row: &Row<'_>) -> std::result::Result<GrantRecord, RowIssue> {
        let agency = canonical_name(&row.text(self.agency));
        if agency.is_empty() {
            return Err(RowIssue::MissingAgency);
        }
        let recipient = canonical_name(&row.text(self.recipient));
        if recipient.is_empty() {
            return Err(RowIssue::MissingRecipient);
        }
        let value = parse_amount(&row.text(self.value)).ok_or(RowIssue::InvalidValue)?;
        if value < 0.0 {
            return Err(RowIssue::NegativeValue);
        }

        let released = parse_amount(&row.text_opt(self.released))
            .filter(|v| *v >= 0.0)
            .unwrap_or(0.0);
        let uf = canonical_name(&row.text_opt(self.uf));

        Ok(GrantRecord {
            number: canonical_code(&row.text_opt(self.number)),
            agency_code: canonical_code(&row.text_opt(self.agency_code)),
            agency,
            recipient_code: canonical_code(&row.text_opt(self.recipient_code)),
            recipient,
            value,
            released,
            published: parse_date(&row.text_opt(self.published)),
            uf: if uf.is_empty() { NO_UF.to_string() } else { uf },
            municipality_code: canonical_code(&row.text_opt(self.municipality_code)),
            line: row.line,
        })
    }
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

/// Column positions in a benefit-payment export.
#[derive(Debug, Clone)]
pub struct PaymentColumns {
    uf: usize,
    municipality_code: usize,
    municipality: usize,
    beneficiary: usize,
    value: usize,
    cpf: Option<usize>,
    nis: Option<usize>,
    competence: Option<usize>,
    reference: Option<usize>,
}

impl PaymentColumns {
    pub fn resolve(header: &Header) -> Result<Self> {
        Ok(Self {
            uf: header.require("UF")?,
            municipality_code: header.require("CÓDIGO MUNICÍPIO SIAFI")?,
            municipality: header.require("NOME MUNICÍPIO")?,
            beneficiary: header.require("NOME FAVORECIDO")?,
            value: header.require("VALOR PARCELA")?,
            cpf: header.optional("CPF FAVORECIDO"),
            nis: header.optional("NIS FAVORECIDO"),
            competence: header.optional("MÊS COMPETÊNCIA"),
            reference: header.optional("MÊS REFERÊNCIA"),
        })
    }

    pub fn parse(&self, row: &Row<'_>) -> std::result::Result<PaymentRecord, RowIssue> {
        let value = parse_amount(&row.text(self.value)).ok_or(RowIssue::InvalidValue)?;
        let beneficiary = canonical_name(&row.text(self.beneficiary));
        if beneficiary.is_empty() {
            return Err(RowIssue::MissingBeneficiary);
        }
        if value <= 0.0 {
            return Err(RowIssue::NonPositiveValue);
        }
        let municipality_code =
            canonical_code(&row.text(self.municipality_code)).ok_or(RowIssue::MissingMunicipality)?;

        Ok(PaymentRecord {
            competence: parse_month(&row.text_opt(self.competence)),
            reference: parse_month(&row.text_opt(self.reference)),
            uf: canonical_name(&row.text(self.uf)),
            municipality_code,
            municipality: canonical_name(&row.text(self.municipality)),
            cpf: canonical_code(&row.text_opt(self.cpf)).unwrap_or_else(|| NO_CPF.to_string()),
            nis: canonical_code(&row.text_opt(self.nis)).unwrap_or_else(|| NO_NIS.to_string()),
            beneficiary,
            value,
            line: row.line,
        })
    }
}

impl PaymentRecord {
    /// 64-bit fingerprint of every cleaned field except the line number.
    /// Two rows with equal fingerprints are treated as duplicates.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.competence.hash(&mut hasher);
        self.reference.hash(&mut hasher);
        self.uf.hash(&mut hasher);
        self.municipality_code.hash(&mut hasher);
        self.municipality.hash(&mut hasher);
        self.cpf.hash(&mut hasher);
        self.nis.hash(&mut hasher);
        self.beneficiary.hash(&mut hasher);
        self.value.to_bits().hash(&mut hasher);
        hasher.finish()
    }

    pub fn has_cpf(&self) -> bool {
        self.cpf != NO_CPF
    }
}
