//! User, group and host lookups over the `/Registry` section
//!
//! Layout:
//! ```yaml
//! Registry:
//!   DefaultGroup: user
//!   Users:
//!     alice: { DN: /DC=org/CN=alice }
//!   Groups:
//!     ops: { Users: alice, Properties: Operator, VOMSRole: /vo/Role=ops }
//!   Hosts:
//!     box1: { DN: /DC=org/CN=box1, Properties: TrustedHost }
//! ```

use crate::config::{ConfigError, ConfigRegistry};

const BASE: &str = "/Registry";

/// Read-only view over the registry section
pub struct Registry<'a> {
    config: &'a ConfigRegistry,
}

impl<'a> Registry<'a> {
    pub fn new(config: &'a ConfigRegistry) -> Self {
        Self { config }
    }

    /// Find the user owning a DN
    pub fn username_for_dn(&self, dn: &str) -> Result<String, ConfigError> {
        let users = self.config.get_sections(&format!("{}/Users", BASE))?;
        self.username_for_dn_in(dn, &users)
    }

    /// Find the user owning a DN among an explicit user list
    pub fn username_for_dn_in(&self, dn: &str, users: &[String]) -> Result<String, ConfigError> {
        users
            .iter()
            .find(|user| self.dns_of(&format!("{}/Users/{}/DN", BASE, user), dn))
            .cloned()
            .ok_or_else(|| ConfigError::NotFound(format!("No username found for dn {}", dn)))
    }

    /// DNs registered for a user
    pub fn dn_for_username(&self, username: &str) -> Result<Vec<String>, ConfigError> {
        let dns = self
            .config
            .get_list(&format!("{}/Users/{}/DN", BASE, username));
        if dns.is_empty() {
            return Err(ConfigError::NotFound(format!(
                "No DN found for user {}",
                username
            )));
        }
        Ok(dns)
    }

    /// Groups a user belongs to, sorted
    pub fn groups_for_user(&self, username: &str) -> Result<Vec<String>, ConfigError> {
        let groups = self.config.get_sections(&format!("{}/Groups", BASE))?;
        let mut user_groups: Vec<String> = groups
            .into_iter()
            .filter(|group| {
                self.users_in_group(group)
                    .iter()
                    .any(|member| member == username)
            })
            .collect();

        if user_groups.is_empty() {
            return Err(ConfigError::NotFound(format!(
                "No groups found for user {}",
                username
            )));
        }
        user_groups.sort();
        Ok(user_groups)
    }

    pub fn groups_for_dn(&self, dn: &str) -> Result<Vec<String>, ConfigError> {
        let username = self.username_for_dn(dn)?;
        self.groups_for_user(&username)
    }

    /// Find the host owning a DN
    pub fn hostname_for_dn(&self, dn: &str) -> Result<String, ConfigError> {
        let hosts = self.config.get_sections(&format!("{}/Hosts", BASE))?;
        hosts
            .into_iter()
            .find(|host| self.dns_of(&format!("{}/Hosts/{}/DN", BASE, host), dn))
            .ok_or_else(|| ConfigError::NotFound(format!("No hostname found for dn {}", dn)))
    }

    pub fn default_user_group(&self) -> String {
        self.config
            .get_value_or(&format!("{}/DefaultGroup", BASE), "user")
    }

    /// Every registered user; empty when the section is missing
    pub fn all_users(&self) -> Vec<String> {
        self.config
            .get_sections(&format!("{}/Users", BASE))
            .unwrap_or_default()
    }

    pub fn users_in_group(&self, group: &str) -> Vec<String> {
        self.config
            .get_list(&format!("{}/Groups/{}/Users", BASE, group))
    }

    pub fn properties_for_group(&self, group: &str) -> Vec<String> {
        self.config
            .get_list(&format!("{}/Groups/{}/Properties", BASE, group))
    }

    pub fn properties_for_host(&self, host: &str) -> Vec<String> {
        self.config
            .get_list(&format!("{}/Hosts/{}/Properties", BASE, host))
    }

    /// Properties of a group, or of a host when `group` is `hosts`.
    /// A host may be given by name or resolved from its DN.
    pub fn properties_for_entity(
        &self,
        group: &str,
        name: Option<&str>,
        dn: Option<&str>,
    ) -> Vec<String> {
        if group != "hosts" {
            return self.properties_for_group(group);
        }

        let host = match (name, dn) {
            (Some(name), _) if !name.is_empty() => name.to_string(),
            (_, Some(dn)) => match self.hostname_for_dn(dn) {
                Ok(host) => host,
                Err(_) => return Vec::new(),
            },
            _ => return Vec::new(),
        };
        self.properties_for_host(&host)
    }

    pub fn banned_ips(&self) -> Vec<String> {
        self.config.get_list(&format!("{}/BannedIPs", BASE))
    }

    pub fn default_voms_attribute(&self) -> String {
        self.config
            .get_value_or(&format!("{}/DefaultVOMSAttribute", BASE), "")
    }

    pub fn voms_attribute_for_group(&self, group: &str) -> String {
        self.config
            .get_value(&format!("{}/Groups/{}/VOMSRole", BASE, group))
            .unwrap_or_else(|| self.default_voms_attribute())
    }

    /// Default VOMS VO, falling back to the installation's virtual organization
    pub fn default_voms_vo(&self) -> String {
        match self.config.get_value(&format!("{}/DefaultVOMSVO", BASE)) {
            Some(vo) if !vo.is_empty() => vo,
            _ => self.config.get_value_or("/System/VirtualOrganization", ""),
        }
    }

    pub fn voms_vo_for_group(&self, group: &str) -> String {
        self.config
            .get_value(&format!("{}/Groups/{}/VOMSVO", BASE, group))
            .unwrap_or_else(|| self.default_voms_vo())
    }

    /// Groups whose VOMS role equals `attribute`
    pub fn groups_with_voms_attribute(&self, attribute: &str) -> Vec<String> {
        let Ok(groups) = self.config.get_sections(&format!("{}/Groups", BASE)) else {
            return Vec::new();
        };
        groups
            .into_iter()
            .filter(|group| {
                self.config
                    .get_value(&format!("{}/Groups/{}/VOMSRole", BASE, group))
                    .as_deref()
                    == Some(attribute)
            })
            .collect()
    }

    fn dns_of(&self, path: &str, dn: &str) -> bool {
        self.config.get_list(path).iter().any(|entry| entry == dn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    const SAMPLE: &str = r#"
System:
  VirtualOrganization: atlas
Registry:
  DefaultGroup: atlas_user
  DefaultVOMSAttribute: /atlas
  BannedIPs: 192.168.1.10
  Users:
    alice:
      DN: /DC=org/CN=alice
    bob:
      DN: /DC=org/CN=bob
  Groups:
    ops:
      Users: alice, bob
      Properties: Operator, FullDelegation
      VOMSRole: /atlas/Role=ops
    users:
      Users: bob
      VOMSVO: cms
  Hosts:
    box1:
      DN: /DC=org/CN=box1.example.org
      Properties: TrustedHost
"#;

    fn registry() -> Result<ConfigRegistry> {
        Ok(ConfigRegistry::from_yaml_str(SAMPLE)?)
    }

    #[test]
    fn test_user_and_dn_lookups() -> Result<()> {
        let config = registry()?;
        let registry = Registry::new(&config);

        assert_eq!(registry.username_for_dn("/DC=org/CN=bob")?, "bob");
        assert_eq!(registry.dn_for_username("alice")?, vec!["/DC=org/CN=alice"]);

        let err = registry.username_for_dn("/DC=org/CN=mallory").unwrap_err();
        assert_eq!(err.to_string(), "No username found for dn /DC=org/CN=mallory");
        assert!(registry.dn_for_username("mallory").is_err());
        Ok(())
    }

    #[test]
    fn test_group_lookups() -> Result<()> {
        let config = registry()?;
        let registry = Registry::new(&config);

        assert_eq!(registry.groups_for_user("bob")?, vec!["ops", "users"]);
        assert_eq!(registry.groups_for_dn("/DC=org/CN=alice")?, vec!["ops"]);
        assert!(registry.groups_for_user("carol").is_err());
        assert_eq!(
            registry.properties_for_group("ops"),
            vec!["Operator", "FullDelegation"]
        );
        assert_eq!(registry.default_user_group(), "atlas_user");
        Ok(())
    }

    #[test]
    fn test_host_lookups() -> Result<()> {
        let config = registry()?;
        let registry = Registry::new(&config);

        assert_eq!(
            registry.hostname_for_dn("/DC=org/CN=box1.example.org")?,
            "box1"
        );
        assert_eq!(
            registry.properties_for_entity("hosts", None, Some("/DC=org/CN=box1.example.org")),
            vec!["TrustedHost"]
        );
        assert!(registry
            .properties_for_entity("hosts", None, Some("/DC=org/CN=unknown"))
            .is_empty());
        assert_eq!(
            registry.properties_for_entity("ops", None, None),
            vec!["Operator", "FullDelegation"]
        );
        assert_eq!(registry.banned_ips(), vec!["192.168.1.10"]);
        Ok(())
    }

    #[test]
    fn test_voms_lookups() -> Result<()> {
        let config = registry()?;
        let registry = Registry::new(&config);

        assert_eq!(registry.voms_attribute_for_group("ops"), "/atlas/Role=ops");
        assert_eq!(registry.voms_attribute_for_group("users"), "/atlas");
        assert_eq!(registry.voms_vo_for_group("users"), "cms");
        assert_eq!(registry.voms_vo_for_group("ops"), "atlas");
        assert_eq!(
            registry.groups_with_voms_attribute("/atlas/Role=ops"),
            vec!["ops"]
        );
        Ok(())
    }

    #[test]
    fn test_empty_registry() {
        let config = ConfigRegistry::empty();
        let registry = Registry::new(&config);
        assert!(registry.all_users().is_empty());
        assert_eq!(registry.default_user_group(), "user");
        assert!(registry.groups_with_voms_attribute("/x").is_empty());
        assert!(matches!(
            registry.username_for_dn("/DC=org/CN=x"),
            Err(ConfigError::MissingPath(_))
        ));
    }
}
