use serde::Deserialize;
use std::borrow::Cow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Validate, Debug, Clone, Deserialize)]
pub struct RedeemReferralDto {
    pub user_id: Uuid,

    #[validate(length(min = 1, message = "Referral code is required"))]
    pub code: String,

    #[validate(length(max = 32, message = "Source must be at most 32 characters"))]
    pub source: Option<String>,
}

impl RedeemReferralDto {
    // Codes are six alphanumerics; checked up front so a typo never reaches
    // the database lookup.
    pub fn validate_code_format(&self) -> Result<(), ValidationError> {
        let code_regex = regex::Regex::new(r"^[A-Za-z0-9]{6}$")
            .map_err(|_| ValidationError::new("invalid_code_regex"))?;

        if !code_regex.is_match(self.code.trim()) {
            let mut error = ValidationError::new("invalid_referral_code");
            error.message = Some(Cow::from("Referral code must be exactly 6 letters or digits"));
            return Err(error);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompleteOnboardingDto {
    pub user_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto(code: &str) -> RedeemReferralDto {
        RedeemReferralDto {
            user_id: Uuid::new_v4(),
            code: code.to_string(),
            source: None,
        }
    }

    #[test]
    fn six_alphanumerics_pass() {
        assert!(dto("AB23CD").validate_code_format().is_ok());
        assert!(dto("ab23cd").validate_code_format().is_ok());
        assert!(dto(" AB23CD ").validate_code_format().is_ok());
    }

    #[test]
    fn wrong_shapes_fail() {
        assert!(dto("AB23C").validate_code_format().is_err());
        assert!(dto("AB23CDE").validate_code_format().is_err());
        assert!(dto("AB-3CD").validate_code_format().is_err());
        assert!(dto("").validate_code_format().is_err());
    }
}
