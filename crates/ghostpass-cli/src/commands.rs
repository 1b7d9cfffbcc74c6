//! Subcommand definitions and their execution against a store

use anyhow::{anyhow, bail, Context as _};
use clap::Subcommand;
use tracing::{debug, info};
use zeroize::Zeroizing;

use ghostpass_core::{GuardedSecret, MasterKey, SecretStore, SettingsManager, StoreManager};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new secret store
    Init {
        /// Name of the store
        name: String,
        /// Make this the default store
        #[arg(long)]
        default: bool,
    },

    /// List all stores
    Stores,

    /// Set the default store
    Use {
        /// Name of an existing store
        name: String,
    },

    /// Add a credential field
    Add {
        /// Service the credentials belong to
        service: String,
        #[arg(short, long)]
        username: String,
        /// Field password (prompted for when omitted)
        #[arg(long, env = "GHOSTPASS_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },

    /// Remove a credential field
    Remove {
        service: String,
    },

    /// Replace the credentials of an existing field
    Overwrite {
        service: String,
        #[arg(short, long)]
        username: String,
        #[arg(long, env = "GHOSTPASS_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },

    /// Show the decrypted credentials of one field
    View {
        service: String,
    },

    /// List fields and their usernames
    List,

    /// Attach a decoy pair to a field (held in memory only, never saved)
    Deny {
        service: String,
        #[arg(short, long)]
        username: String,
        #[arg(long, env = "GHOSTPASS_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },

    /// Print a field's sealed auth pair as hex
    Export {
        service: String,
    },

    /// Add a field from a hex auth pair sealed under this store's key
    Import {
        service: String,
        /// Output of `export`
        authpair: String,
    },

    /// Delete a store and all of its fields
    Destroy {
        name: String,
    },
}

/// Everything a command needs: storage, settings, and credentials
pub struct Context {
    manager: StoreManager,
    settings: SettingsManager,
    store: Option<String>,
    password: Option<Zeroizing<String>>,
}

impl Context {
    pub fn new(
        manager: StoreManager,
        settings: SettingsManager,
        store: Option<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            manager,
            settings,
            store,
            password: password.map(Zeroizing::new),
        }
    }

    /// Run a command, returning the text to print on stdout
    pub async fn run(&mut self, command: Command) -> anyhow::Result<Zeroizing<String>> {
        debug!("Running command: {}", command_name(&command));

        match command {
            Command::Init { name, default } => {
                let password = self.master_password(true)?;
                let params = self.settings.get().kdf.clone();
                self.manager
                    .create(&name, &password, Some(params))
                    .await
                    .with_context(|| format!("Failed to create store {}", name))?;

                if default || self.settings.default_store().is_none() {
                    self.settings.set_default_store(Some(name.clone())).await?;
                }
                Ok(format!("Created store {}", name).into())
            }

            Command::Stores => {
                let default = self.settings.default_store().map(str::to_owned);
                let lines: Vec<String> = self
                    .manager
                    .list()
                    .await?
                    .into_iter()
                    .map(|name| {
                        if Some(&name) == default.as_ref() {
                            format!("* {}", name)
                        } else {
                            format!("  {}", name)
                        }
                    })
                    .collect();
                Ok(lines.join("\n").into())
            }

            Command::Use { name } => {
                if !self.manager.exists(&name).await? {
                    bail!("Store {} does not exist", name);
                }
                self.settings.set_default_store(Some(name.clone())).await?;
                Ok(format!("Default store is now {}", name).into())
            }

            Command::Add {
                service,
                username,
                secret,
            } => {
                let (mut store, key) = self.open().await?;
                let secret = field_secret(&service, secret)?;
                store.add_field(&key, &service, &username, secret)?;
                self.manager.save(&store).await?;
                Ok(format!("Added field {}", service).into())
            }

            Command::Remove { service } => {
                let (mut store, _key) = self.open().await?;
                store.remove_field(&service)?;
                self.manager.save(&store).await?;
                Ok(format!("Removed field {}", service).into())
            }

            Command::Overwrite {
                service,
                username,
                secret,
            } => {
                let (mut store, key) = self.open().await?;
                // fail before prompting if the field is missing
                store.field(&service)?;
                let secret = field_secret(&service, secret)?;
                store.overwrite_field(&key, &service, &username, secret)?;
                self.manager.save(&store).await?;
                Ok(format!("Overwrote field {}", service).into())
            }

            Command::View { service } => {
                let (mut store, _key) = self.open().await?;
                let table = {
                    let (user, pwd) = store.field(&service)?.credentials()?;
                    let (user, pwd) = (user.open()?, pwd.open()?);
                    let row = vec![service.as_str(), user.as_str()?, pwd.as_str()?];
                    render_table(&["Service", "Username", "Password"], &[row])
                };
                store.lock();
                Ok(table)
            }

            Command::List => {
                let (mut store, _key) = self.open().await?;
                let table = {
                    let mut views = Vec::with_capacity(store.len());
                    for (service, field) in store.fields() {
                        let (user, _) = field.credentials()?;
                        views.push((service, user.open()?));
                    }

                    let mut rows = Vec::with_capacity(views.len());
                    for (service, user) in &views {
                        rows.push(vec![*service, user.as_str()?]);
                    }
                    render_table(&["Service", "Username"], &rows)
                };
                store.lock();
                Ok(table)
            }

            Command::Deny {
                service,
                username,
                secret,
            } => {
                let (mut store, _key) = self.open().await?;
                let secret = field_secret(&service, secret)?;
                store.add_deniable(&service, &username, &secret)?;

                let field = store.field(&service)?;
                let count = field.deniable_count();
                let decoy = field
                    .deniable_pair(count - 1)?
                    .ok_or_else(|| anyhow!("Decoy pair for {} was not recorded", service))?;
                Ok(format!(
                    "Attached decoy pair for {} to {} ({} in memory). Decoy pairs are not encrypted and are not saved.",
                    decoy.username.as_str(),
                    service,
                    count
                )
                .into())
            }

            Command::Export { service } => {
                let (store, _key) = self.open().await?;
                Ok(store.field(&service)?.to_hex().into())
            }

            Command::Import { service, authpair } => {
                let (mut store, key) = self.open().await?;
                store.import_field(&key, &service, &authpair)?;
                self.manager.save(&store).await?;
                Ok(format!("Imported field {}", service).into())
            }

            Command::Destroy { name } => {
                self.manager.delete(&name).await?;
                if self.settings.default_store() == Some(name.as_str()) {
                    self.settings.set_default_store(None).await?;
                }
                info!("Destroyed store {}", name);
                Ok(format!("Destroyed store {}", name).into())
            }
        }
    }

    fn store_name(&self) -> anyhow::Result<String> {
        self.store
            .clone()
            .or_else(|| self.settings.default_store().map(str::to_owned))
            .ok_or_else(|| anyhow!("No store selected. Pass --store or run `ghostpass init <name>`"))
    }

    async fn open(&self) -> anyhow::Result<(SecretStore, MasterKey)> {
        let name = self.store_name()?;
        let password = self.master_password(false)?;
        let opened = self
            .manager
            .open(&name, &password)
            .await
            .with_context(|| format!("Failed to open store {}", name))?;
        Ok(opened)
    }

    fn master_password(&self, confirm: bool) -> anyhow::Result<Zeroizing<String>> {
        if let Some(password) = &self.password {
            return Ok(password.clone());
        }

        let password = Zeroizing::new(rpassword::prompt_password("Master password: ")?);
        if confirm {
            let again = Zeroizing::new(rpassword::prompt_password("Confirm master password: ")?);
            if *password != *again {
                bail!("Passwords do not match");
            }
        }
        Ok(password)
    }
}

fn field_secret(service: &str, secret: Option<String>) -> anyhow::Result<GuardedSecret> {
    match secret {
        Some(secret) => Ok(GuardedSecret::from(secret)),
        None => {
            let prompted = rpassword::prompt_password(format!("Password for {}: ", service))?;
            Ok(GuardedSecret::from(prompted))
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Init { .. } => "init",
        Command::Stores => "stores",
        Command::Use { .. } => "use",
        Command::Add { .. } => "add",
        Command::Remove { .. } => "remove",
        Command::Overwrite { .. } => "overwrite",
        Command::View { .. } => "view",
        Command::List => "list",
        Command::Deny { .. } => "deny",
        Command::Export { .. } => "export",
        Command::Import { .. } => "import",
        Command::Destroy { .. } => "destroy",
    }
}

/// Render rows as a left-aligned text table with a header rule.
///
/// Cells may borrow secret views; the output buffer is sized up front so it
/// never reallocates and is wiped on drop.
pub fn render_table<C: AsRef<str>>(headers: &[&str], rows: &[Vec<C>]) -> Zeroizing<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.as_ref().chars().count());
            }
        }
    }

    // a char is at most 4 bytes, padding is 1 byte per missing char
    let line_cap = widths.iter().sum::<usize>() * 4 + 2 * widths.len() + 1;
    let mut out = Zeroizing::new(String::with_capacity(line_cap * (rows.len() + 2)));

    push_row(&mut out, headers.iter().copied(), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, rule.iter().map(String::as_str), &widths);
    for row in rows {
        push_row(&mut out, row.iter().map(AsRef::as_ref), &widths);
    }

    // drop the final newline
    out.pop();
    out
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let start = out.len();
    for (i, (cell, width)) in cells.zip(widths).enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        out.push_str(cell);
        for _ in cell.chars().count()..*width {
            out.push(' ');
        }
    }

    let kept = out[start..].trim_end().len();
    out.truncate(start + kept);
    out.push('\n');
}
