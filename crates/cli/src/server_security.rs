use anyhow::{Context as AnyhowContext, Result};
use std::net::SocketAddr;

/// Resolve `bind` and refuse non-loopback addresses unless `public` is set
pub(crate) async fn resolve_guarded_bind_addrs(
    bind: &str,
    public: bool,
) -> Result<Vec<SocketAddr>> {
    let addrs = resolve_bind_addrs(bind).await?;
    enforce_bind_guard_for_addrs(bind, &addrs, public)?;
    Ok(addrs)
}

async fn resolve_bind_addrs(bind: &str) -> Result<Vec<SocketAddr>> {
    // Resolve via Tokio so "localhost" behaves as expected.
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(bind)
        .await
        .with_context(|| format!("Failed to resolve bind address: {bind}"))?
        .collect();

    if addrs.is_empty() {
        anyhow::bail!("Bind address resolved to zero socket addrs: {bind}")
    }
    Ok(addrs)
}

fn enforce_bind_guard_for_addrs(bind: &str, addrs: &[SocketAddr], public: bool) -> Result<()> {
    let any_non_loopback = addrs.iter().any(|addr| !addr.ip().is_loopback());
    if any_non_loopback && !public {
        anyhow::bail!(
            "Refusing to bind to non-loopback address without --public: {bind}. The chat API has no authentication; pass --public (or set server.public in the config file) only behind a trusted proxy."
        )
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_guard_requires_public_for_non_loopback() {
        resolve_guarded_bind_addrs("127.0.0.1:0", false)
            .await
            .unwrap();

        let err = resolve_guarded_bind_addrs("0.0.0.0:0", false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--public"));
        resolve_guarded_bind_addrs("0.0.0.0:0", true).await.unwrap();
    }

    #[test]
    fn loopback_v6_is_allowed() {
        let addrs = ["[::1]:5000".parse().unwrap()];
        enforce_bind_guard_for_addrs("[::1]:5000", &addrs, false).unwrap();
    }
}
