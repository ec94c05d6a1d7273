//! Service catalog types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Banking service a customer can queue for.
///
/// Each service type has its own ticket sequence and display prefix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    /// Deposits, withdrawals, transfers.
    Teller,
    /// Account opening, product information.
    CustomerService,
    /// Credit applications and loan consultation.
    Loan,
}

impl ServiceType {
    /// All service types, in catalog order.
    pub const ALL: [ServiceType; 3] = [
        ServiceType::Teller,
        ServiceType::CustomerService,
        ServiceType::Loan,
    ];

    /// Returns the service type as a string (for filtering and storage).
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Teller => "teller",
            ServiceType::CustomerService => "customer_service",
            ServiceType::Loan => "loan",
        }
    }

    /// Returns the immutable catalog entry for this service type.
    pub fn info(&self) -> &'static ServiceInfo {
        match self {
            ServiceType::Teller => &SERVICE_CATALOG[0],
            ServiceType::CustomerService => &SERVICE_CATALOG[1],
            ServiceType::Loan => &SERVICE_CATALOG[2],
        }
    }

    /// Single-letter prefix used in display codes.
    pub fn prefix(&self) -> char {
        self.info().prefix
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown service type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownServiceType(pub String);

impl fmt::Display for UnknownServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown service type: {}", self.0)
    }
}

impl std::error::Error for UnknownServiceType {}

impl FromStr for ServiceType {
    type Err = UnknownServiceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownServiceType(s.to_string()))
    }
}

/// Catalog entry describing a service type.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceInfo {
    pub id: ServiceType,
    /// Display name.
    pub name: &'static str,
    /// Prefix letter for display codes.
    pub prefix: char,
    pub description: &'static str,
    /// Estimated time to serve one customer, in minutes.
    pub estimated_minutes: u32,
}

/// The fixed service catalog.
pub static SERVICE_CATALOG: [ServiceInfo; 3] = [
    ServiceInfo {
        id: ServiceType::Teller,
        name: "Teller",
        prefix: 'A',
        description: "Setor, tarik tunai, transfer",
        estimated_minutes: 5,
    },
    ServiceInfo {
        id: ServiceType::CustomerService,
        name: "Customer Service",
        prefix: 'B',
        description: "Pembukaan rekening, informasi produk",
        estimated_minutes: 15,
    },
    ServiceInfo {
        id: ServiceType::Loan,
        name: "Kredit/Pinjaman",
        prefix: 'C',
        description: "Pengajuan kredit, konsultasi pinjaman",
        estimated_minutes: 30,
    },
];

/// Build the human-readable display code for a ticket number.
///
/// The number is zero-padded to three digits; larger numbers print in full.
pub fn display_code(service_type: ServiceType, number: u32) -> String {
    format!("{}{:03}", service_type.prefix(), number)
}
