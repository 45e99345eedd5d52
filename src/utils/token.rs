use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rand::{distributions::Alphanumeric, thread_rng, Rng};

use crate::error::Result;
use crate::middleware::auth::{Claims, CurrentUser};

const CERTIFICATE_CODE_LEN: usize = 8;

/// `CERT-` followed by eight uppercase letters or digits.
pub fn generate_certificate_code() -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CERTIFICATE_CODE_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("CERT-{}", suffix)
}

/// Mints an HS256 bearer token for `user`, valid for `ttl`.
pub fn issue_token(secret: &str, user: &CurrentUser, ttl: Duration) -> Result<String> {
    let exp = (Utc::now() + ttl).timestamp().max(0) as usize;
    let claims = Claims {
        sub: user.id.to_string(),
        exp,
        role: Some(user.role.as_str().to_string()),
        name: Some(user.name.clone()),
        email: Some(user.email.clone()).filter(|e| !e.is_empty()),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::Role;
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use uuid::Uuid;

    #[test]
    fn certificate_codes_have_the_printed_shape() {
        let code = generate_certificate_code();
        assert!(code.starts_with("CERT-"));
        let suffix = &code[5..];
        assert_eq!(suffix.len(), CERTIFICATE_CODE_LEN);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn issued_tokens_round_trip_into_the_same_user() {
        let user = CurrentUser {
            id: Uuid::new_v4(),
            role: Role::Instructor,
            name: "Dana Reyes".into(),
            email: "dana@example.com".into(),
        };
        let token = issue_token("secret", &user, Duration::hours(1)).unwrap();
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(CurrentUser::try_from(&data.claims).unwrap(), user);
    }
}
