//! Command execution.

use std::io::Write;

use anyhow::{Context, Result};
use cloudid_core::{
    AccountBackend, AccountStore, OAuthGrant, PreferenceStore, ServerInfo, UserInfo,
};

use crate::cli::{Command, ProvisionArgs};

/// Execute one command against the store, writing its output to `out`.
pub async fn run<B, W>(store: &AccountStore<B>, command: Command, out: &mut W) -> Result<()>
where
    B: AccountBackend + PreferenceStore,
    W: Write,
{
    match command {
        Command::AddBasic { account, password } => {
            let (server, user) = inputs(&account);
            let name = store
                .add_basic_account(
                    account.prior_url.as_deref(),
                    &account.user,
                    &password,
                    &server,
                    &user,
                    account.update,
                )
                .await
                .context("Failed to add basic account")?;
            writeln!(out, "{name}")?;
        }
        Command::AddOauth {
            account,
            access_token,
            refresh_token,
            token_type,
            scope,
        } => {
            let (server, user) = inputs(&account);
            let mut grant = OAuthGrant::new(token_type, access_token, refresh_token);
            grant.scope = scope;
            let name = store
                .add_oauth_account(
                    account.prior_url.as_deref(),
                    &account.user,
                    &grant,
                    &server,
                    &user,
                    account.update,
                )
                .await
                .context("Failed to add OAuth account")?;
            writeln!(out, "{name}")?;
        }
        Command::List => {
            let default = store.default_account().await?;
            for name in store.accounts().await? {
                let marker = if default.as_deref() == Some(name.as_str()) {
                    "*"
                } else {
                    " "
                };
                writeln!(out, "{marker} {name}")?;
            }
        }
        Command::Default => match store.default_account().await? {
            Some(name) => writeln!(out, "{name}")?,
            None => writeln!(out, "(none)")?,
        },
        Command::Switch { identity } => {
            let name = store.switch_default(&identity).await?;
            writeln!(out, "{name}")?;
        }
        Command::BaseUrl { identity } => {
            writeln!(out, "{}", store.base_url(&identity).await?)?;
        }
        Command::SupportsOauth { identity } => {
            writeln!(out, "{}", store.supports_oauth2(&identity).await?)?;
        }
        Command::Show { identity } => {
            let info = store.account_info(&identity).await?;
            writeln!(out, "{}", serde_json::to_string_pretty(&info)?)?;
        }
    }
    Ok(())
}

fn inputs(args: &ProvisionArgs) -> (ServerInfo, UserInfo) {
    let server = ServerInfo::new(&args.url).with_version(&args.server_version);
    let user = UserInfo::new(args.display_name.as_deref().unwrap_or(&args.user));
    (server, user)
}
