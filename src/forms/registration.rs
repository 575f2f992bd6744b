use uuid::Uuid;

use super::{Cleaner, FieldError, FieldKind, FieldSpec, FormData};
use crate::catalog::{
    now, Account, Credential, Profile, EMAIL_MAX_LENGTH, INSTITUTION_MAX_LENGTH,
    PERSON_NAME_MAX_LENGTH, USERNAME_MAX_LENGTH,
};
use crate::error::CatalogResult;
use crate::password::{PasswordHasher, PasswordPolicy, UserAttributes, MAX_PASSWORD_LENGTH};
use crate::store::CatalogStore;

const USERNAME: FieldSpec = FieldSpec::new("username", "Username", FieldKind::Text)
    .required()
    .max_length(USERNAME_MAX_LENGTH);
const EMAIL: FieldSpec =
    FieldSpec::new("email", "Email address", FieldKind::Email).max_length(EMAIL_MAX_LENGTH);
const FIRST_NAME: FieldSpec =
    FieldSpec::new("first_name", "First name", FieldKind::Text).max_length(PERSON_NAME_MAX_LENGTH);
const LAST_NAME: FieldSpec =
    FieldSpec::new("last_name", "Last name", FieldKind::Text).max_length(PERSON_NAME_MAX_LENGTH);
const BIOGRAPHY: FieldSpec = FieldSpec::new("biography", "Biography", FieldKind::TextArea);
const INSTITUTION: FieldSpec = FieldSpec::new("institution", "Institution", FieldKind::Text)
    .max_length(INSTITUTION_MAX_LENGTH);
const PASSWORD: FieldSpec = FieldSpec::new("password", "Password", FieldKind::Password)
    .required()
    .max_length(MAX_PASSWORD_LENGTH);
const PASSWORD_CONFIRMATION: FieldSpec = FieldSpec::new(
    "password_confirmation",
    "Password confirmation",
    FieldKind::Password,
)
.required()
.max_length(MAX_PASSWORD_LENGTH);

/// Sign-up form: generic credential fields plus the researcher profile.
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    data: FormData,
    policy: PasswordPolicy,
}

/// A registration that passed validation but has not been turned into an
/// account yet.
#[derive(Clone)]
pub struct ValidatedRegistration {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub biography: String,
    pub institution: String,
    password: String,
}

impl std::fmt::Debug for ValidatedRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedRegistration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("biography", &self.biography)
            .field("institution", &self.institution)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl RegistrationForm {
    pub const FIELDS: &'static [FieldSpec] = &[
        USERNAME,
        EMAIL,
        FIRST_NAME,
        LAST_NAME,
        BIOGRAPHY,
        INSTITUTION,
        PASSWORD,
        PASSWORD_CONFIRMATION,
    ];

    pub fn bind(data: &FormData) -> Self {
        Self {
            data: data.restrict(Self::FIELDS),
            policy: PasswordPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Validates every field, checking username availability in `store`.
    pub async fn validate(&self, store: &dyn CatalogStore) -> CatalogResult<ValidatedRegistration> {
        let mut cleaner = Cleaner::new(&self.data);

        let username = cleaner.text(&USERNAME);
        if !username.is_empty() && !cleaner.has_error(USERNAME.name) {
            if !is_valid_username(&username) {
                cleaner.add_error(USERNAME.name, FieldError::InvalidUsername);
            } else if store.find_account_by_username(&username).await?.is_some() {
                cleaner.add_error(USERNAME.name, FieldError::DuplicateUsername);
            }
        }

        let email = cleaner.text(&EMAIL);
        if !email.is_empty() && !cleaner.has_error(EMAIL.name) && !is_valid_email(&email) {
            cleaner.add_error(EMAIL.name, FieldError::InvalidEmail);
        }

        let first_name = cleaner.text(&FIRST_NAME);
        let last_name = cleaner.text(&LAST_NAME);
        let biography = cleaner.text(&BIOGRAPHY);
        let institution = cleaner.text(&INSTITUTION);

        let password = cleaner.text(&PASSWORD);
        let confirmation = cleaner.text(&PASSWORD_CONFIRMATION);
        if !password.is_empty()
            && !confirmation.is_empty()
            && !cleaner.has_error(PASSWORD.name)
            && !cleaner.has_error(PASSWORD_CONFIRMATION.name)
        {
            if password != confirmation {
                cleaner.add_error(PASSWORD_CONFIRMATION.name, FieldError::PasswordMismatch);
            } else {
                let attributes = UserAttributes {
                    username: &username,
                    email: &email,
                    first_name: &first_name,
                    last_name: &last_name,
                };
                for error in self.policy.check(&password, &attributes) {
                    cleaner.add_error(PASSWORD.name, error);
                }
            }
        }

        let registration = ValidatedRegistration {
            username,
            email,
            first_name,
            last_name,
            biography,
            institution,
            password,
        };
        cleaner
            .finish()
            .into_result(registration)
            .map_err(Into::into)
    }
}

impl ValidatedRegistration {
    /// Builds the account without storing it. Callers persist it through
    /// `CatalogStore::create_account` once they are done adjusting it.
    pub fn build(self, hasher: &PasswordHasher) -> Account {
        Account {
            id: Uuid::new_v4(),
            credential: Credential {
                password_hash: hasher.hash(&self.password),
                username: self.username,
                email: self.email,
                first_name: self.first_name,
                last_name: self.last_name,
                is_active: true,
                date_joined: now(),
                last_login: None,
            },
            profile: Profile {
                biography: self.biography,
                institution: self.institution,
            },
        }
    }
}

fn is_valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '@' | '.' | '+' | '-'))
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}
