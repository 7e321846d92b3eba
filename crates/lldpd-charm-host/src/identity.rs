//! Host identity

use lldpd_charm_core::{Error, Result};

/// Host name as reported by the kernel (uname nodename)
pub fn system_hostname() -> Result<String> {
    let hostname = nix::unistd::gethostname()
        .map_err(|e| Error::Other(format!("Failed to read hostname: {}", e)))?;

    hostname
        .into_string()
        .map_err(|raw| Error::Other(format!("Hostname is not valid UTF-8: {:?}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_is_not_empty() {
        assert!(!system_hostname().unwrap().is_empty());
    }
}
