use crate::error::AnalysisError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    pub id: Option<i64>,
    pub name: String,
}

impl Company {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into().trim().to_string(),
        }
    }

    pub fn with_id(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.name.trim().is_empty() {
            return Err(AnalysisError::invalid("Company name is required"));
        }
        Ok(())
    }

    /// Find a company by name (case-insensitive) in a slice.
    pub fn find_by_name<'a>(companies: &'a [Company], name: &str) -> Option<&'a Company> {
        let lower = name.trim().to_lowercase();
        companies.iter().find(|c| c.name.to_lowercase() == lower)
    }

    pub fn find_by_id(companies: &[Company], id: i64) -> Option<&Company> {
        companies.iter().find(|c| c.id == Some(id))
    }
}

impl std::fmt::Display for Company {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
