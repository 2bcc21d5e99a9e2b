//! Provider credentials read from the process environment.

use projectdrive_common::{Error, Result, SecretString};

/// Collects required and optional variables, remembering every missing one.
struct EnvReader<F> {
    lookup: F,
    missing: Vec<&'static str>,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn new(lookup: F) -> Self {
        Self {
            lookup,
            missing: Vec::new(),
        }
    }

    fn optional(&self, key: &'static str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&mut self, key: &'static str) -> String {
        match self.optional(key) {
            Some(value) => value,
            None => {
                self.missing.push(key);
                String::new()
            }
        }
    }

    fn finish(self, what: &str) -> Result<()> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Configuration(format!(
                "{} is not configured; missing environment variables: {}",
                what,
                self.missing.join(", ")
            )))
        }
    }
}

/// Dropbox app credentials.
#[derive(Debug, Clone)]
pub struct DropboxConfig {
    pub app_key: String,
    pub app_secret: SecretString,
    pub refresh_token: SecretString,
    /// Team member to act as (`Dropbox-API-Select-User`).
    pub team_member_id: Option<String>,
    /// Base path under which project roots are created. Empty means the
    /// account root.
    pub root_path: String,
}

impl DropboxConfig {
    pub const APP_KEY: &'static str = "DROPBOX_APP_KEY";
    pub const APP_SECRET: &'static str = "DROPBOX_APP_SECRET";
    pub const REFRESH_TOKEN: &'static str = "DROPBOX_REFRESH_TOKEN";
    pub const TEAM_MEMBER_ID: &'static str = "DROPBOX_TEAM_MEMBER_ID";
    pub const ROOT_PATH: &'static str = "DROPBOX_ROOT_PATH";

    /// Load from the process environment.
    ///
    /// # Errors
    /// - `Error::Configuration` naming every missing required variable
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut env = EnvReader::new(lookup);
        let app_key = env.required(Self::APP_KEY);
        let app_secret = env.required(Self::APP_SECRET);
        let refresh_token = env.required(Self::REFRESH_TOKEN);
        let team_member_id = env.optional(Self::TEAM_MEMBER_ID);
        let root_path = env
            .optional(Self::ROOT_PATH)
            .map(|p| normalize_dropbox_root(&p))
            .unwrap_or_default();
        env.finish("Dropbox")?;

        Ok(Self {
            app_key,
            app_secret: SecretString::from(app_secret),
            refresh_token: SecretString::from(refresh_token),
            team_member_id,
            root_path,
        })
    }
}

/// `"Clients/"` and `"/Clients"` both become `"/Clients"`; `"/"` becomes `""`.
fn normalize_dropbox_root(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Google service account credentials.
#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub service_account_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: SecretString,
    /// Folder under which project roots are created. Must already be shared
    /// with the service account.
    pub root_folder_id: String,
    /// User to impersonate through domain-wide delegation.
    pub impersonate_subject: Option<String>,
}

impl DriveConfig {
    pub const SERVICE_ACCOUNT_EMAIL: &'static str = "GDRIVE_SERVICE_ACCOUNT_EMAIL";
    pub const PRIVATE_KEY: &'static str = "GDRIVE_PRIVATE_KEY";
    pub const ROOT_FOLDER_ID: &'static str = "GDRIVE_ROOT_FOLDER_ID";
    pub const IMPERSONATE_SUBJECT: &'static str = "GDRIVE_IMPERSONATE_SUBJECT";

    /// Load from the process environment.
    ///
    /// # Errors
    /// - `Error::Configuration` naming every missing required variable
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut env = EnvReader::new(lookup);
        let service_account_email = env.required(Self::SERVICE_ACCOUNT_EMAIL);
        let private_key = env.required(Self::PRIVATE_KEY);
        let root_folder_id = env.required(Self::ROOT_FOLDER_ID);
        let impersonate_subject = env.optional(Self::IMPERSONATE_SUBJECT);
        env.finish("Google Drive")?;

        Ok(Self {
            service_account_email,
            // Keys pasted into a single-line variable keep literal "\n".
            private_key: SecretString::from(private_key.replace("\\n", "\n")),
            root_folder_id,
            impersonate_subject,
        })
    }
}
