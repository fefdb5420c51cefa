//! CSV seeding for properties and deal sites.

use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use super::domain::{
    BookingMode, DealSite, DealSiteStatus, PartyContact, Property, PropertyId, PropertyType,
    ShortletTerms, UserId,
};
use super::repository::DirectoryRepository;
use crate::workflows::store::RepositoryError;

#[derive(Debug)]
pub enum CatalogImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },
    Repository(RepositoryError),
}

impl std::fmt::Display for CatalogImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogImportError::Io(err) => write!(f, "failed to read catalog: {}", err),
            CatalogImportError::Csv(err) => write!(f, "invalid catalog CSV data: {}", err),
            CatalogImportError::InvalidField { line, field, value } => write!(
                f,
                "catalog row {} has an invalid {} value '{}'",
                line, field, value
            ),
            CatalogImportError::Repository(err) => {
                write!(f, "could not store catalog entry: {}", err)
            }
        }
    }
}

impl std::error::Error for CatalogImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogImportError::Io(err) => Some(err),
            CatalogImportError::Csv(err) => Some(err),
            CatalogImportError::InvalidField { .. } => None,
            CatalogImportError::Repository(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for CatalogImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<RepositoryError> for CatalogImportError {
    fn from(err: RepositoryError) -> Self {
        Self::Repository(err)
    }
}

pub struct CatalogImporter;

impl CatalogImporter {
    pub fn properties_from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Vec<Property>, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::properties_from_reader(file)
    }

    pub fn properties_from_reader<R: Read>(reader: R) -> Result<Vec<Property>, CatalogImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut properties = Vec::new();

        for (index, row) in csv_reader.deserialize::<PropertyRow>().enumerate() {
            // header occupies line 1
            properties.push(row?.into_property(index + 2)?);
        }

        Ok(properties)
    }

    pub fn deal_sites_from_reader<R: Read>(
        reader: R,
    ) -> Result<Vec<DealSite>, CatalogImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut sites = Vec::new();

        for (index, row) in csv_reader.deserialize::<DealSiteRow>().enumerate() {
            sites.push(row?.into_deal_site(index + 2)?);
        }

        Ok(sites)
    }

    pub fn deal_sites_from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Vec<DealSite>, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::deal_sites_from_reader(file)
    }

    pub fn seed_deal_sites<P: AsRef<Path>>(
        path: P,
        directory: &dyn DirectoryRepository,
    ) -> Result<usize, CatalogImportError> {
        let sites = Self::deal_sites_from_path(path)?;
        let count = sites.len();
        for site in sites {
            directory.save_deal_site(site)?;
        }
        Ok(count)
    }

    /// Stores every property in `path` and returns how many were loaded.
    pub fn seed_properties<P: AsRef<Path>>(
        path: P,
        directory: &dyn DirectoryRepository,
    ) -> Result<usize, CatalogImportError> {
        let properties = Self::properties_from_path(path)?;
        let count = properties.len();
        for property in properties {
            directory.save_property(property)?;
        }
        Ok(count)
    }
}

#[derive(Debug, Deserialize)]
struct PropertyRow {
    id: String,
    title: String,
    #[serde(default)]
    location: String,
    #[serde(rename = "type")]
    property_type: String,
    price: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    inspection_fee: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    nightly_rate: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    weekly_discount: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    monthly_discount: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    cleaning_fee: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    security_deposit: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    booking_mode: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    available: Option<String>,
    owner_id: String,
    owner_name: String,
    owner_email: String,
}

impl PropertyRow {
    fn into_property(self, line: usize) -> Result<Property, CatalogImportError> {
        let property_type = match self.property_type.to_ascii_lowercase().as_str() {
            "shortlet" => PropertyType::Shortlet,
            "rent" => PropertyType::Rent,
            "sale" => PropertyType::Sale,
            "joint_venture" | "jv" => PropertyType::JointVenture,
            _ => return Err(invalid(line, "type", self.property_type)),
        };
        let booking_mode = match self.booking_mode.as_deref().map(str::to_ascii_lowercase) {
            None => BookingMode::Instant,
            Some(mode) if mode == "instant" => BookingMode::Instant,
            Some(mode) if mode == "manual" => BookingMode::Manual,
            Some(other) => return Err(invalid(line, "booking_mode", other)),
        };
        let is_available = match self.available.as_deref().map(str::to_ascii_lowercase) {
            None => true,
            Some(flag) if matches!(flag.as_str(), "true" | "yes" | "1") => true,
            Some(flag) if matches!(flag.as_str(), "false" | "no" | "0") => false,
            Some(other) => return Err(invalid(line, "available", other)),
        };

        Ok(Property {
            id: PropertyId(self.id),
            title: self.title,
            location: self.location,
            property_type,
            price: decimal(line, "price", Some(self.price))?,
            inspection_fee: decimal(line, "inspection_fee", self.inspection_fee)?,
            shortlet: ShortletTerms {
                nightly_rate: self
                    .nightly_rate
                    .map(|raw| decimal(line, "nightly_rate", Some(raw)))
                    .transpose()?,
                weekly_discount_percent: decimal(line, "weekly_discount", self.weekly_discount)?,
                monthly_discount_percent: decimal(line, "monthly_discount", self.monthly_discount)?,
                cleaning_fee: decimal(line, "cleaning_fee", self.cleaning_fee)?,
                security_deposit: decimal(line, "security_deposit", self.security_deposit)?,
                booking_mode,
            },
            is_available,
            owner: PartyContact {
                id: UserId(self.owner_id),
                full_name: self.owner_name,
                email: self.owner_email,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct DealSiteRow {
    slug: String,
    title: String,
    status: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    subaccount: Option<String>,
    owner_id: String,
    owner_name: String,
    owner_email: String,
}

impl DealSiteRow {
    fn into_deal_site(self, line: usize) -> Result<DealSite, CatalogImportError> {
        let status = match self.status.to_ascii_lowercase().as_str() {
            "running" => DealSiteStatus::Running,
            "paused" => DealSiteStatus::Paused,
            "on_hold" | "on-hold" => DealSiteStatus::OnHold,
            _ => return Err(invalid(line, "status", self.status)),
        };

        Ok(DealSite {
            public_slug: self.slug,
            title: self.title,
            owner: PartyContact {
                id: UserId(self.owner_id),
                full_name: self.owner_name,
                email: self.owner_email,
            },
            status,
            subaccount_code: self.subaccount,
        })
    }
}

fn invalid(line: usize, field: &'static str, value: String) -> CatalogImportError {
    CatalogImportError::InvalidField { line, field, value }
}

fn decimal(
    line: usize,
    field: &'static str,
    raw: Option<String>,
) -> Result<Decimal, CatalogImportError> {
    match raw {
        None => Ok(Decimal::ZERO),
        Some(value) => match Decimal::from_str(value.trim()) {
            Ok(parsed) if !parsed.is_sign_negative() => Ok(parsed),
            _ => Err(invalid(line, field, value)),
        },
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "id,title,location,type,price,inspection_fee,nightly_rate,weekly_discount,monthly_discount,cleaning_fee,security_deposit,booking_mode,available,owner_id,owner_name,owner_email\n";

    #[test]
    fn parses_shortlet_rows_with_defaults() {
        let csv = format!(
            "{HEADER}prop-1,Lekki Loft,Lekki,shortlet,100000,,,10,20,5000,,manual,,owner-1,Ada Owner,ada@example.com\n"
        );
        let properties =
            CatalogImporter::properties_from_reader(Cursor::new(csv)).expect("catalog parses");

        assert_eq!(properties.len(), 1);
        let property = &properties[0];
        assert_eq!(property.property_type, PropertyType::Shortlet);
        assert_eq!(property.price, Decimal::from(100_000));
        assert_eq!(property.inspection_fee, Decimal::ZERO);
        assert!(property.shortlet.nightly_rate.is_none());
        assert_eq!(property.shortlet.weekly_discount_percent, Decimal::from(10));
        assert_eq!(property.shortlet.booking_mode, BookingMode::Manual);
        assert!(property.is_available);
        assert_eq!(property.owner.email, "ada@example.com");
    }

    #[test]
    fn reports_line_of_invalid_price() {
        let csv = format!(
            "{HEADER}prop-1,Loft,Lekki,shortlet,100000,,,,,,,,,o,O,o@example.com\nprop-2,Flat,Yaba,rent,abc,,,,,,,,,o,O,o@example.com\n"
        );
        let error = CatalogImporter::properties_from_reader(Cursor::new(csv))
            .expect_err("second row is invalid");

        match error {
            CatalogImportError::InvalidField { line, field, value } => {
                assert_eq!(line, 3);
                assert_eq!(field, "price");
                assert_eq!(value, "abc");
            }
            other => panic!("expected invalid field, got {other:?}"),
        }
    }

    #[test]
    fn parses_deal_sites() {
        let csv = "slug,title,status,subaccount,owner_id,owner_name,owner_email\n\
ikoyi-homes,Ikoyi Homes,running,ACCT_123,agent-1,Bola Agent,bola@example.com\n\
quiet-site,Quiet,paused,,agent-2,Chi Agent,chi@example.com\n";
        let sites =
            CatalogImporter::deal_sites_from_reader(Cursor::new(csv)).expect("sites parse");

        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].status, DealSiteStatus::Running);
        assert_eq!(sites[0].subaccount_code.as_deref(), Some("ACCT_123"));
        assert_eq!(sites[1].status, DealSiteStatus::Paused);
        assert!(sites[1].subaccount_code.is_none());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        match CatalogImporter::properties_from_path("./does-not-exist.csv") {
            Err(CatalogImportError::Io(_)) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
