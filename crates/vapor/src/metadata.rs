//! bootstrap metadata (`AWS::CloudFormation::Init`)
//!
//! The metadata sub-language describes what `cfn-init` does on a freshly provisioned machine. It
//! is a tree of its own:
//!
//! - a [CfnInit] holds named config sets, [Config]s and [Authentication] blocks
//! - a config set lists config names, in the order they run
//! - a [Config] holds packages, groups, users, sources, files, commands and services
//!
//! [CfnInit::build] checks the cross references inside the tree (config set -> config,
//! file -> authentication) and renders the value for [crate::element::Resource::metadata].
//!
//! ```
//! use vapor::metadata::{CfnInit, Config, FileSpec, Service};
//!
//! let init = CfnInit::new()
//!     .config_set_of("default", vec![
//!         Config::new("Install").package("yum", "td-agent"),
//!         Config::new("Configure")
//!             .file("/etc/td-agent/td-agent.conf", FileSpec::inline(["<source>\n", "</source>\n"]).mode("000644"))
//!             .unwrap(),
//!         Config::new("Start").service("sysvinit", "td-agent", Service::new().enabled(true).ensure_running(true)),
//!     ])
//!     .build()
//!     .unwrap();
//! # let _ = init;
//! ```
use crate::error::{Error, LookupError, Result};
use crate::intrinsics;
use crate::value::{Object, Value};
use indexmap::IndexMap;
use std::path::Path;

const INIT_KEY: &str = "AWS::CloudFormation::Init";
const AUTHENTICATION_KEY: &str = "AWS::CloudFormation::Authentication";

#[derive(Debug, Default)]
pub struct CfnInit {
    config_sets: IndexMap<String, Vec<String>>,
    configs: Vec<Config>,
    authentications: Vec<Authentication>,
}

impl CfnInit {
    pub fn new() -> Self {
        Self::default()
    }

    /// List configs (by name) that run together, in order
    pub fn config_set<N: Into<String>>(
        mut self,
        name: impl Into<String>,
        configs: impl IntoIterator<Item = N>,
    ) -> Self {
        self.config_sets
            .insert(name.into(), configs.into_iter().map(Into::into).collect());
        self
    }

    /// Declare a config
    pub fn config(mut self, config: Config) -> Self {
        self.configs.push(config);
        self
    }

    /// Declare `configs` and list them as config set `name`
    pub fn config_set_of(self, name: impl Into<String>, configs: Vec<Config>) -> Self {
        let names: Vec<String> = configs.iter().map(|config| config.name.clone()).collect();
        configs
            .into_iter()
            .fold(self.config_set(name, names), CfnInit::config)
    }

    pub fn authentication(mut self, authentication: Authentication) -> Self {
        self.authentications.push(authentication);
        self
    }

    /// Check cross references and render the `Metadata` value
    pub fn build(self) -> Result<Value> {
        for (index, config) in self.configs.iter().enumerate() {
            if self.configs[..index]
                .iter()
                .any(|other| other.name == config.name)
            {
                return Err(Error::Construction(format!(
                    "config `{}` is declared more than once",
                    config.name
                )));
            }
        }

        for (config_set, names) in &self.config_sets {
            for name in names {
                if !self.configs.iter().any(|config| &config.name == name) {
                    return Err(LookupError::UnknownConfig {
                        config_set: config_set.clone(),
                        config: name.clone(),
                    }
                    .into());
                }
            }
        }

        for config in &self.configs {
            for (path, authentication) in config.authentications() {
                if !self
                    .authentications
                    .iter()
                    .any(|declared| declared.name == authentication)
                {
                    return Err(LookupError::UnknownAuthentication {
                        path: path.to_string(),
                        authentication: authentication.to_string(),
                    }
                    .into());
                }
            }
        }

        let mut init = Object::new();
        if !self.config_sets.is_empty() {
            init.insert(
                "configSets".to_string(),
                Value::object(
                    self.config_sets
                        .into_iter()
                        .map(|(name, configs)| (name, Value::from(configs))),
                ),
            );
        }
        for config in self.configs {
            tracing::trace!(config = %config.name, "render config");
            let (name, value) = config.into_entry();
            init.insert(name, value);
        }

        let mut metadata = Object::new();
        metadata.insert(INIT_KEY.to_string(), Value::Object(init));
        if !self.authentications.is_empty() {
            metadata.insert(
                AUTHENTICATION_KEY.to_string(),
                Value::object(
                    self.authentications
                        .into_iter()
                        .map(|authentication| (authentication.name, authentication.fields)),
                ),
            );
        }

        Ok(Value::Object(metadata))
    }
}

/// Read a file as content fragments for [FileSpec::inline]
///
/// Every line keeps its line break.
pub fn read_fragments(path: &Path) -> std::io::Result<Vec<Value>> {
    tracing::debug!(path = %path.display(), "reading file content");
    let contents = std::fs::read_to_string(path)?;
    Ok(contents.split_inclusive('\n').map(Value::from).collect())
}

#[derive(Debug)]
pub struct Config {
    name: String,
    packages: Object,
    groups: Object,
    users: Object,
    sources: Object,
    files: Object,
    commands: Object,
    services: Object,
    file_authentications: Vec<(String, String)>,
}

impl Config {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            packages: Default::default(),
            groups: Default::default(),
            users: Default::default(),
            sources: Default::default(),
            files: Default::default(),
            commands: Default::default(),
            services: Default::default(),
            file_authentications: Default::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Install the latest version of a package
    pub fn package(self, manager: impl Into<String>, name: impl Into<String>) -> Self {
        self.package_versions(manager, name, Vec::<String>::new())
    }

    pub fn package_versions<V: Into<String>>(
        mut self,
        manager: impl Into<String>,
        name: impl Into<String>,
        versions: impl IntoIterator<Item = V>,
    ) -> Self {
        let versions: Vec<Value> = versions
            .into_iter()
            .map(|version| Value::String(version.into()))
            .collect();
        insert_nested(&mut self.packages, manager.into(), name.into(), versions.into());
        self
    }

    pub fn group(mut self, name: impl Into<String>, gid: Option<u32>) -> Self {
        let mut group = Object::new();
        if let Some(gid) = gid {
            group.insert("gid".to_string(), gid.to_string().into());
        }
        self.groups.insert(name.into(), Value::Object(group));
        self
    }

    pub fn user(mut self, name: impl Into<String>, user: User) -> Self {
        self.users.insert(name.into(), Value::Object(user.fields));
        self
    }

    /// Download and unpack an archive into `target_directory`
    pub fn source(mut self, target_directory: impl Into<String>, url: impl Into<Value>) -> Self {
        self.sources.insert(target_directory.into(), url.into());
        self
    }

    /// Fails with [Error::AmbiguousFileSource] unless `spec` has exactly one of content or source
    pub fn file(mut self, path: impl Into<String>, spec: FileSpec) -> Result<Self> {
        let path = path.into();
        let mut fields = Object::new();
        match (spec.content, spec.source) {
            (Some(content), None) => {
                fields.insert(
                    "content".to_string(),
                    intrinsics::join("", Value::Array(content)),
                );
            }
            (None, Some(source)) => {
                fields.insert("source".to_string(), source);
            }
            _ => return Err(Error::AmbiguousFileSource { path }),
        }
        fields.extend(spec.fields);

        self.file_authentications
            .retain(|(existing, _)| existing != &path);
        if let Some(authentication) = spec.authentication {
            fields.insert("authentication".to_string(), authentication.clone().into());
            self.file_authentications
                .push((path.clone(), authentication));
        }

        self.files.insert(path, Value::Object(fields));
        Ok(self)
    }

    /// Run a command; `key` orders commands alphabetically
    pub fn command(mut self, key: impl Into<String>, command: impl Into<Command>) -> Self {
        self.commands
            .insert(key.into(), Value::Object(command.into().fields));
        self
    }

    /// One descriptor per `(init_system, name)`, a later call replaces it
    pub fn service(
        mut self,
        init_system: impl Into<String>,
        name: impl Into<String>,
        service: Service,
    ) -> Self {
        let init_system = init_system.into();
        let name = name.into();
        let services = self
            .services
            .entry(init_system)
            .or_insert_with(|| Value::Object(Object::new()));
        if let Value::Object(services) = services {
            services.insert(name, Value::Object(service.fields));
        }
        self
    }

    fn authentications(&self) -> impl Iterator<Item = (&str, &str)> {
        self.file_authentications
            .iter()
            .map(|(path, authentication)| (path.as_str(), authentication.as_str()))
    }

    /// Render in the order cfn-init processes the keys
    fn into_entry(self) -> (String, Value) {
        let sections = [
            ("packages", self.packages),
            ("groups", self.groups),
            ("users", self.users),
            ("sources", self.sources),
            ("files", self.files),
            ("commands", self.commands),
            ("services", self.services),
        ];

        let body = sections
            .into_iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(key, entries)| (key, Value::Object(entries)));

        (self.name, Value::object(body))
    }
}

fn insert_nested(object: &mut Object, outer: String, inner: String, value: Value) {
    let mut entry = Object::new();
    entry.insert(inner, value);
    match object.get_mut(&outer) {
        Some(existing) => existing.merge(Value::Object(entry)),
        None => {
            object.insert(outer, Value::Object(entry));
        }
    }
}

/// A file written by [Config::file]
#[derive(Debug, Default)]
pub struct FileSpec {
    content: Option<Vec<Value>>,
    source: Option<Value>,
    authentication: Option<String>,
    fields: Object,
}

impl FileSpec {
    /// Inline content, fragments are joined without separator
    ///
    /// Fragments may be intrinsic values, e.g. a stack id in the middle of a config file.
    pub fn inline<V: Into<Value>>(fragments: impl IntoIterator<Item = V>) -> Self {
        Self::default().content(fragments)
    }

    /// Content downloaded from `url`
    pub fn remote(url: impl Into<Value>) -> Self {
        Self::default().source(url)
    }

    pub fn content<V: Into<Value>>(mut self, fragments: impl IntoIterator<Item = V>) -> Self {
        self.content = Some(fragments.into_iter().map(Into::into).collect());
        self
    }

    pub fn source(mut self, url: impl Into<Value>) -> Self {
        self.source = Some(url.into());
        self
    }

    pub fn encoding(self, encoding: impl Into<String>) -> Self {
        self.field("encoding", encoding)
    }

    pub fn mode(self, mode: impl Into<String>) -> Self {
        self.field("mode", mode)
    }

    pub fn owner(self, owner: impl Into<String>) -> Self {
        self.field("owner", owner)
    }

    pub fn group(self, group: impl Into<String>) -> Self {
        self.field("group", group)
    }

    /// Name of an [Authentication] block declared on the same [CfnInit]
    pub fn authentication(mut self, name: impl Into<String>) -> Self {
        self.authentication = Some(name.into());
        self
    }

    fn field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields
            .insert(key.to_string(), Value::String(value.into()));
        self
    }
}

#[derive(Debug)]
pub struct Command {
    fields: Object,
}

impl Command {
    pub fn new(command: impl Into<Value>) -> Self {
        let mut fields = Object::new();
        fields.insert("command".to_string(), command.into());
        Self { fields }
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        insert_nested(&mut self.fields, "env".to_string(), name.into(), value.into());
        self
    }

    pub fn cwd(mut self, cwd: impl Into<String>) -> Self {
        self.fields
            .insert("cwd".to_string(), Value::String(cwd.into()));
        self
    }

    /// Only run the command when `test` exits with 0
    pub fn test(mut self, test: impl Into<String>) -> Self {
        self.fields
            .insert("test".to_string(), Value::String(test.into()));
        self
    }

    pub fn ignore_errors(mut self, ignore: bool) -> Self {
        self.fields
            .insert("ignoreErrors".to_string(), flag(ignore));
        self
    }

    /// Seconds to wait after the command ran, `forever` waits for a reboot
    pub fn wait_after_completion(mut self, wait: impl Into<String>) -> Self {
        self.fields
            .insert("waitAfterCompletion".to_string(), Value::String(wait.into()));
        self
    }
}

impl From<&str> for Command {
    fn from(value: &str) -> Self {
        Command::new(value)
    }
}

impl From<String> for Command {
    fn from(value: String) -> Self {
        Command::new(value)
    }
}

#[derive(Debug, Default)]
pub struct Service {
    fields: Object,
}

impl Service {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.fields.insert("enabled".to_string(), flag(enabled));
        self
    }

    pub fn ensure_running(mut self, running: bool) -> Self {
        self.fields
            .insert("ensureRunning".to_string(), flag(running));
        self
    }

    /// Restart the service when one of these files changes
    pub fn files<S: Into<String>>(self, paths: impl IntoIterator<Item = S>) -> Self {
        self.list("files", paths)
    }

    pub fn sources<S: Into<String>>(self, directories: impl IntoIterator<Item = S>) -> Self {
        self.list("sources", directories)
    }

    pub fn commands<S: Into<String>>(self, keys: impl IntoIterator<Item = S>) -> Self {
        self.list("commands", keys)
    }

    pub fn packages<S: Into<String>>(
        mut self,
        manager: impl Into<String>,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        let names: Vec<Value> = names
            .into_iter()
            .map(|name| Value::String(name.into()))
            .collect();
        insert_nested(&mut self.fields, "packages".to_string(), manager.into(), names.into());
        self
    }

    fn list<S: Into<String>>(mut self, key: &str, items: impl IntoIterator<Item = S>) -> Self {
        let items: Vec<Value> = items
            .into_iter()
            .map(|item| Value::String(item.into()))
            .collect();
        self.fields.insert(key.to_string(), items.into());
        self
    }
}

#[derive(Debug, Default)]
pub struct User {
    fields: Object,
}

impl User {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn groups<S: Into<String>>(mut self, groups: impl IntoIterator<Item = S>) -> Self {
        let groups: Vec<Value> = groups
            .into_iter()
            .map(|group| Value::String(group.into()))
            .collect();
        self.fields.insert("groups".to_string(), groups.into());
        self
    }

    pub fn uid(mut self, uid: u32) -> Self {
        self.fields
            .insert("uid".to_string(), uid.to_string().into());
        self
    }

    pub fn home_dir(mut self, home_dir: impl Into<String>) -> Self {
        self.fields
            .insert("homeDir".to_string(), Value::String(home_dir.into()));
        self
    }
}

/// Credentials used by cfn-init to download files and sources
#[derive(Debug)]
pub struct Authentication {
    name: String,
    fields: Object,
}

impl Authentication {
    /// Access to S3 buckets, usually through an instance role
    pub fn s3(name: impl Into<String>) -> Self {
        Self::new(name, "S3")
    }

    /// HTTP basic authentication
    pub fn basic(name: impl Into<String>) -> Self {
        Self::new(name, "basic")
    }

    fn new(name: impl Into<String>, kind: &str) -> Self {
        let mut fields = Object::new();
        fields.insert("type".to_string(), kind.into());
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn role_name(self, role: impl Into<Value>) -> Self {
        self.field("roleName", role.into())
    }

    pub fn buckets<S: Into<String>>(self, buckets: impl IntoIterator<Item = S>) -> Self {
        let buckets: Vec<Value> = buckets
            .into_iter()
            .map(|bucket| Value::String(bucket.into()))
            .collect();
        self.field("buckets", buckets.into())
    }

    pub fn uris<S: Into<String>>(self, uris: impl IntoIterator<Item = S>) -> Self {
        let uris: Vec<Value> = uris
            .into_iter()
            .map(|uri| Value::String(uri.into()))
            .collect();
        self.field("uris", uris.into())
    }

    pub fn username(self, username: impl Into<Value>) -> Self {
        self.field("username", username.into())
    }

    pub fn password(self, password: impl Into<Value>) -> Self {
        self.field("password", password.into())
    }

    pub fn access_key_id(self, key: impl Into<Value>) -> Self {
        self.field("accessKeyId", key.into())
    }

    pub fn secret_key(self, key: impl Into<Value>) -> Self {
        self.field("secretKey", key.into())
    }

    fn field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }
}

// cfn-init expects booleans as strings
fn flag(value: bool) -> Value {
    Value::String(value.to_string())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::intrinsics::Pseudo;
    use pretty_assertions::assert_eq;

    fn json(value: &Value) -> serde_json::Value {
        serde_json::to_value(value).unwrap()
    }

    #[test]
    fn config_set_renders_configs_in_order() {
        let metadata = CfnInit::new()
            .config_set_of(
                "default",
                vec![
                    Config::new("SetupRepos").command(
                        "import_key",
                        "rpm --import https://packages.treasuredata.com/GPG-KEY-td-agent",
                    ),
                    Config::new("Install")
                        .package("yum", "dstat")
                        .package("yum", "td-agent"),
                ],
            )
            .build()
            .unwrap();

        assert_eq!(
            json(&metadata),
            serde_json::json!({
                "AWS::CloudFormation::Init": {
                    "configSets": { "default": ["SetupRepos", "Install"] },
                    "SetupRepos": {
                        "commands": {
                            "import_key": {
                                "command": "rpm --import https://packages.treasuredata.com/GPG-KEY-td-agent"
                            }
                        }
                    },
                    "Install": { "packages": { "yum": { "dstat": [], "td-agent": [] } } }
                }
            })
        );

        let Value::Object(metadata) = metadata else {
            panic!("metadata must be an object");
        };
        let init = metadata[INIT_KEY].as_object().unwrap();
        let keys: Vec<_> = init.keys().map(String::as_str).collect();
        assert_eq!(keys, ["configSets", "SetupRepos", "Install"]);
    }

    #[test]
    fn undeclared_config_is_rejected() {
        let err = CfnInit::new()
            .config_set("default", ["Install", "Start"])
            .config(Config::new("Install"))
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            Error::Lookup(LookupError::UnknownConfig {
                config_set: "default".into(),
                config: "Start".into(),
            })
        );
    }

    #[test]
    fn config_declared_twice_is_rejected() {
        let err = CfnInit::new()
            .config(Config::new("Install"))
            .config(Config::new("Install"))
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::Construction(_)));
    }

    #[test]
    fn file_needs_exactly_one_source() {
        let both = FileSpec::inline(["a"]).source("https://example.com/a");
        let err = Config::new("c").file("/tmp/a", both).unwrap_err();
        assert_eq!(
            err,
            Error::AmbiguousFileSource {
                path: "/tmp/a".into()
            }
        );

        let err = Config::new("c")
            .file("/tmp/b", FileSpec::default().mode("000644"))
            .unwrap_err();
        assert!(matches!(err, Error::AmbiguousFileSource { .. }));
    }

    #[test]
    fn inline_content_is_joined() {
        let config = Config::new("Configure")
            .file(
                "/etc/app.conf",
                FileSpec::inline([Value::from("stack="), Pseudo::StackId.into(), "\n".into()])
                    .mode("000644")
                    .owner("root")
                    .group("root"),
            )
            .unwrap();

        let (_, value) = config.into_entry();
        assert_eq!(
            json(&value),
            serde_json::json!({
                "files": {
                    "/etc/app.conf": {
                        "content": { "Fn::Join": ["", ["stack=", { "Ref": "AWS::StackId" }, "\n"]] },
                        "mode": "000644",
                        "owner": "root",
                        "group": "root"
                    }
                }
            })
        );
    }

    #[test]
    fn authentication_must_be_declared() {
        let config = Config::new("Fetch")
            .file(
                "/opt/app.tar",
                FileSpec::remote("https://bucket.s3.amazonaws.com/app.tar").authentication("S3Creds"),
            )
            .unwrap();

        let err = CfnInit::new().config(config).build().unwrap_err();
        assert_eq!(
            err,
            Error::Lookup(LookupError::UnknownAuthentication {
                path: "/opt/app.tar".into(),
                authentication: "S3Creds".into(),
            })
        );

        let config = Config::new("Fetch")
            .file(
                "/opt/app.tar",
                FileSpec::remote("https://bucket.s3.amazonaws.com/app.tar").authentication("S3Creds"),
            )
            .unwrap();
        let metadata = CfnInit::new()
            .config(config)
            .authentication(Authentication::s3("S3Creds").buckets(["bucket"]).role_name("AppRole"))
            .build()
            .unwrap();

        assert_eq!(
            json(&metadata)[AUTHENTICATION_KEY],
            serde_json::json!({
                "S3Creds": { "type": "S3", "buckets": ["bucket"], "roleName": "AppRole" }
            })
        );
    }

    #[test]
    fn redeclared_file_drops_its_authentication() {
        let config = Config::new("Fetch")
            .file(
                "/a",
                FileSpec::remote("https://bucket.s3.amazonaws.com/a").authentication("Creds"),
            )
            .unwrap()
            .file("/a", FileSpec::inline(["hello"]))
            .unwrap();

        let metadata = CfnInit::new().config(config).build().unwrap();
        assert_eq!(
            json(&metadata)[INIT_KEY]["Fetch"]["files"]["/a"],
            serde_json::json!({ "content": { "Fn::Join": ["", ["hello"]] } })
        );
    }

    #[test]
    fn fragments_keep_line_breaks() {
        let path = std::env::temp_dir().join(format!("vapor-fragments-{}.conf", std::process::id()));
        std::fs::write(&path, "<source>\n  type dstat\n</source>").unwrap();

        let fragments = read_fragments(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(
            fragments,
            [
                Value::from("<source>\n"),
                "  type dstat\n".into(),
                "</source>".into()
            ]
        );
    }

    #[test]
    fn service_last_write_wins() {
        let config = Config::new("Start")
            .service("sysvinit", "td-agent", Service::new().enabled(false))
            .service("sysvinit", "nginx", Service::new().enabled(true))
            .service(
                "sysvinit",
                "td-agent",
                Service::new().enabled(true).ensure_running(true),
            );

        let (_, value) = config.into_entry();
        assert_eq!(
            json(&value),
            serde_json::json!({
                "services": {
                    "sysvinit": {
                        "td-agent": { "enabled": "true", "ensureRunning": "true" },
                        "nginx": { "enabled": "true" }
                    }
                }
            })
        );
    }

    #[test]
    fn config_sections_follow_processing_order() {
        let config = Config::new("All")
            .command("01_run", Command::new("echo hi").cwd("/tmp").ignore_errors(true))
            .source("/opt/app", "https://example.com/app.tar.gz")
            .user("app", User::new().groups(["app"]).uid(501).home_dir("/opt/app"))
            .group("app", Some(501))
            .package_versions("python", "boto3", ["1.34.0"]);

        let (name, value) = config.into_entry();
        assert_eq!(name, "All");

        let keys: Vec<_> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["packages", "groups", "users", "sources", "commands"]);
        assert_eq!(
            json(&value)["users"],
            serde_json::json!({ "app": { "groups": ["app"], "uid": "501", "homeDir": "/opt/app" } })
        );
    }
}
