//! Asynchronous MAAS controller client.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use maas_core::client::{parse_retry_after, ClientConfig, RetryPolicy, MAAS_DEFAULT_TIMEOUT};
use maas_core::config::MaasClientConfig;
use maas_core::{ApiVersion, Error, Resource};
use reqwest::header::{ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::args::{
    AddFileArgs, AllocateMachineArgs, CreateDeviceArgs, CreateInterfaceArgs,
    CreateMachineDeviceArgs, DevicesArgs, LinkSubnetArgs, MachinesArgs, ReleaseMachinesArgs,
    StartArgs, UpdateInterfaceArgs,
};
use crate::auth::Authorizer;
use crate::boot_resource::BootResource;
use crate::constraints::AllocatedMachine;
use crate::device::Device;
use crate::fabric::Fabric;
use crate::file::File;
use crate::interface::{Interface, LinkMode};
use crate::machine::Machine;
use crate::space::Space;
use crate::static_route::StaticRoute;
use crate::subnet::Subnet;
use crate::version_info::VersionInfo;
use crate::zone::Zone;
use crate::Result;

const USER_AGENT: &str = concat!("maas-client/", env!("CARGO_PKG_VERSION"));

type Pairs = Vec<(String, String)>;

/// Builder for [`Controller`].
#[derive(Clone)]
pub struct ControllerBuilder {
    base_url: Url,
    api_version: ApiVersion,
    http_config: ClientConfig,
    retry_policy: RetryPolicy,
    authorizer: Option<Arc<dyn Authorizer>>,
}

impl ControllerBuilder {
    /// Create a new builder for the MAAS server at `base_url`, e.g.
    /// `http://maas.example.com:5240/MAAS/`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] for an unparseable URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let mut url = Url::parse(base_url.as_ref()).map_err(|err| {
            Error::ConfigError(format!(
                "Invalid MAAS base URL `{}`: {err}",
                base_url.as_ref()
            ))
        })?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let config =
            ClientConfig::new().with_timeout(Duration::from_secs(MAAS_DEFAULT_TIMEOUT));

        Ok(Self {
            base_url: url,
            api_version: ApiVersion::V2_0,
            retry_policy: config.retry_policy,
            http_config: config,
            authorizer: None,
        })
    }

    /// Create a builder from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] when the configuration does not validate.
    pub fn from_config(config: &MaasClientConfig) -> Result<Self> {
        Ok(Self::new(config.parse_base_url()?)?
            .with_api_version(config.parse_api_version()?)
            .with_http_config(config.client_config()?))
    }

    /// Override the API version to speak. Defaults to 2.0.
    #[must_use]
    pub fn with_api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry_policy = retry;
        self
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.retry_policy = config.retry_policy;
        self.http_config = config;
        self
    }

    /// Authorize every request with `authorizer`.
    #[must_use]
    pub fn with_authorizer(mut self, authorizer: impl Authorizer + 'static) -> Self {
        self.authorizer = Some(Arc::new(authorizer));
        self
    }

    /// Build the client and fetch the controller's version document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedVersion`] when the server does not serve the
    /// requested API version, and any transport or read failure.
    pub async fn connect(self) -> Result<Controller> {
        if self.api_version < ApiVersion::V2_0 {
            return Err(Error::unsupported_version("controller", self.api_version));
        }

        let mut builder = ClientBuilder::new()
            .timeout(self.http_config.timeout)
            .connect_timeout(self.http_config.connect_timeout)
            .user_agent(USER_AGENT);

        if !self.http_config.enable_compression {
            builder = builder.no_gzip();
        }

        let http = builder.build().map_err(|err| {
            Error::ConfigError(format!("Failed to build MAAS HTTP client: {err}"))
        })?;

        let mut controller = Controller {
            http,
            base_url: self.base_url,
            api_version: self.api_version,
            retry_policy: self.retry_policy,
            authorizer: self.authorizer,
            requests: Arc::new(AtomicU64::new(0)),
            version_info: VersionInfo {
                version: self.api_version,
                subversion: String::new(),
                capabilities: BTreeSet::new(),
            },
        };
        controller.version_info = controller.fetch_version_info().await?;

        info!(
            base_url = %controller.base_url,
            api_version = %controller.api_version,
            maas_version = %controller.version_info.version,
            "connected to MAAS controller"
        );
        Ok(controller)
    }
}

enum Body<'a> {
    Empty,
    Form(&'a Pairs),
    File { filename: &'a str, content: &'a [u8] },
}

/// Asynchronous client for a MAAS region controller.
///
/// Cloning is cheap; clones share the HTTP connection state and the request
/// counter.
#[derive(Clone)]
pub struct Controller {
    http: Client,
    base_url: Url,
    api_version: ApiVersion,
    retry_policy: RetryPolicy,
    authorizer: Option<Arc<dyn Authorizer>>,
    requests: Arc<AtomicU64>,
    version_info: VersionInfo,
}

impl Controller {
    /// Connect to `base_url` with default settings and no authorization.
    ///
    /// # Errors
    ///
    /// See [`ControllerBuilder::connect`].
    pub async fn connect(base_url: impl AsRef<str>) -> Result<Self> {
        ControllerBuilder::new(base_url)?.connect().await
    }

    /// Connect using a validated configuration.
    ///
    /// # Errors
    ///
    /// See [`ControllerBuilder::from_config`] and [`ControllerBuilder::connect`].
    pub async fn from_config(config: &MaasClientConfig) -> Result<Self> {
        ControllerBuilder::from_config(config)?.connect().await
    }

    /// Access the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The API version responses are read with.
    #[must_use]
    pub fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    /// The version document fetched at connect time.
    #[must_use]
    pub fn version_info(&self) -> &VersionInfo {
        &self.version_info
    }

    /// Capabilities advertised by the controller.
    #[must_use]
    pub fn capabilities(&self) -> &BTreeSet<String> {
        &self.version_info.capabilities
    }

    /// Number of HTTP requests sent so far, retries included.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// List boot resources.
    pub async fn boot_resources(&self) -> Result<Vec<BootResource>> {
        self.get_list("boot-resources/", None, &[]).await
    }

    /// List fabrics with their VLANs.
    pub async fn fabrics(&self) -> Result<Vec<Fabric>> {
        self.get_list("fabrics/", None, &[]).await
    }

    /// List spaces with their subnets.
    pub async fn spaces(&self) -> Result<Vec<Space>> {
        self.get_list("spaces/", None, &[]).await
    }

    /// List static routes.
    pub async fn static_routes(&self) -> Result<Vec<StaticRoute>> {
        self.get_list("static-routes/", None, &[]).await
    }

    /// List availability zones.
    pub async fn zones(&self) -> Result<Vec<Zone>> {
        self.get_list("zones/", None, &[]).await
    }

    /// List machines matching `args`.
    pub async fn machines(&self, args: &MachinesArgs) -> Result<Vec<Machine>> {
        let machines: Vec<Machine> = self
            .get_list("machines/", None, &owned(args.to_pairs()))
            .await?;
        Ok(machines
            .into_iter()
            .filter(|machine| args.matches_owner_data(machine))
            .collect())
    }

    /// Allocate a machine matching `args`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotValid`] for bad constraints and [`Error::NoMatch`]
    /// when no machine satisfies them.
    pub async fn allocate_machine(&self, args: &AllocateMachineArgs) -> Result<AllocatedMachine> {
        args.validate()?;
        let path = self.api_path("machines/");
        let value = self
            .post(&path, "allocate", &owned(args.to_pairs()))
            .await
            .map_err(|err| match err {
                Error::CannotComplete(body) => Error::NoMatch(body),
                other => other,
            })?;
        self.read_with(&path, &value, AllocatedMachine::read)
    }

    /// Release machines back to the pool. Releasing nothing is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CannotComplete`] when a machine is in a state that
    /// cannot be released.
    pub async fn release_machines(&self, args: &ReleaseMachinesArgs) -> Result<()> {
        if args.system_ids.is_empty() {
            return Ok(());
        }
        let path = self.api_path("machines/");
        self.post(&path, "release", &owned(args.to_pairs()))
            .await
            .map(|_| ())
    }

    /// Deploy `machine` and refresh it from the response.
    pub async fn start_machine(&self, machine: &mut Machine, args: &StartArgs) -> Result<()> {
        let fresh: Machine = self
            .post_read(&machine.resource_uri, Some("deploy"), &owned(args.to_pairs()))
            .await?;
        machine.update_from(fresh)
    }

    /// Replace entries of `machine`'s owner data. An empty value removes the
    /// key.
    pub async fn set_machine_owner_data(
        &self,
        machine: &mut Machine,
        owner_data: &BTreeMap<String, String>,
    ) -> Result<()> {
        let params: Pairs = owner_data
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let fresh: Machine = self
            .post_read(&machine.resource_uri, Some("set_owner_data"), &params)
            .await?;
        machine.update_from(fresh)
    }

    /// List devices matching `args`.
    pub async fn devices(&self, args: &DevicesArgs) -> Result<Vec<Device>> {
        self.get_list("devices/", None, &owned(args.to_pairs())).await
    }

    /// Create a device.
    pub async fn create_device(&self, args: &CreateDeviceArgs) -> Result<Device> {
        args.validate()?;
        let path = self.api_path("devices/");
        self.post_read(&path, None, &owned(args.to_pairs())).await
    }

    /// Create a device parented to `machine`, name its interface, attach it to
    /// the requested VLAN, and statically link it to the subnet if one is
    /// given. The device is deleted again if any later step fails.
    pub async fn create_machine_device(
        &self,
        machine: &Machine,
        args: &CreateMachineDeviceArgs,
    ) -> Result<Device> {
        args.validate()?;
        let mut device = self
            .create_device(&CreateDeviceArgs {
                hostname: args.hostname.clone(),
                mac_addresses: vec![args.mac_address.clone()],
                parent: machine.system_id.to_string(),
                ..CreateDeviceArgs::default()
            })
            .await?;

        match self.configure_machine_device(&mut device, args).await {
            Ok(()) => Ok(device),
            Err(err) => {
                if let Err(cleanup) = self.delete_device(&device).await {
                    warn!(
                        system_id = %device.system_id,
                        error = %cleanup,
                        "failed to delete partially created device"
                    );
                }
                Err(err)
            }
        }
    }

    async fn configure_machine_device(
        &self,
        device: &mut Device,
        args: &CreateMachineDeviceArgs,
    ) -> Result<()> {
        let count = device.interfaces.len();
        let [iface] = device.interfaces.as_mut_slice() else {
            return Err(Error::CannotComplete(format!(
                "expected new device to have one interface, found {count}"
            )));
        };

        self.update_interface(
            iface,
            &UpdateInterfaceArgs {
                name: args.interface_name.clone(),
                vlan_id: args.effective_vlan_id(),
                ..UpdateInterfaceArgs::default()
            },
        )
        .await?;

        if let Some(subnet) = &args.subnet {
            self.link_subnet(iface, &LinkSubnetArgs::new(LinkMode::Static, subnet))
                .await?;
        }
        Ok(())
    }

    /// Delete a device.
    pub async fn delete_device(&self, device: &Device) -> Result<()> {
        self.delete(&device.resource_uri).await
    }

    /// Create a physical interface on `device` and append it to the device's
    /// interfaces.
    pub async fn create_device_interface(
        &self,
        device: &mut Device,
        args: &CreateInterfaceArgs,
    ) -> Result<Interface> {
        args.validate()?;
        let path = format!("{}interfaces/", device.resource_uri);
        let iface: Interface = self
            .post_read(&path, Some("create_physical"), &owned(args.to_pairs()))
            .await?;
        device.interfaces.push(iface.clone());
        Ok(iface)
    }

    /// Update an interface in place. Empty arguments send nothing.
    pub async fn update_interface(
        &self,
        iface: &mut Interface,
        args: &UpdateInterfaceArgs,
    ) -> Result<()> {
        if args.is_empty() {
            return Ok(());
        }
        let value = self
            .send_value(
                Method::PUT,
                &iface.resource_uri,
                &[],
                Body::Form(&owned(args.to_pairs())),
            )
            .await?;
        let fresh = self.read_with(&iface.resource_uri, &value, Interface::read)?;
        iface.update_from(fresh)
    }

    /// Link `iface` to a subnet and refresh it.
    pub async fn link_subnet(&self, iface: &mut Interface, args: &LinkSubnetArgs) -> Result<()> {
        args.validate()?;
        let fresh: Interface = self
            .post_read(&iface.resource_uri, Some("link_subnet"), &owned(args.to_pairs()))
            .await?;
        iface.update_from(fresh)
    }

    /// Remove `iface`'s link to `subnet` and refresh it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotValid`] when the interface has no link to the subnet.
    pub async fn unlink_subnet(&self, iface: &mut Interface, subnet: &Subnet) -> Result<()> {
        let link_id = iface
            .link_for_subnet(subnet.id)
            .map(|link| link.id)
            .ok_or_else(|| {
                Error::NotValid(format!(
                    "interface {:?} is not linked to subnet {:?}",
                    iface.name, subnet.cidr
                ))
            })?;
        let params = vec![("id".to_string(), link_id.to_string())];
        let fresh: Interface = self
            .post_read(&iface.resource_uri, Some("unlink_subnet"), &params)
            .await?;
        iface.update_from(fresh)
    }

    /// List stored files whose names start with `prefix`.
    pub async fn files(&self, prefix: &str) -> Result<Vec<File>> {
        let mut params = Pairs::new();
        if !prefix.is_empty() {
            params.push(("prefix".to_string(), prefix.to_string()));
        }
        self.get_list("files/", Some("list"), &params).await
    }

    /// Fetch a stored file, including its content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no such file exists.
    pub async fn get_file(&self, filename: &str) -> Result<File> {
        if filename.is_empty() {
            return Err(Error::NotValid("missing filename".to_string()));
        }
        let mut url = self.endpoint(&self.api_path("files/"))?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidEndpoint(format!("cannot extend {}", self.base_url)))?
            .pop_if_empty()
            .push(filename)
            .push("");
        let path = url.path().to_string();
        let value = self.send_value(Method::GET, &path, &[], Body::Empty).await?;
        self.read_with(&path, &value, File::read)
    }

    /// Upload a file.
    pub async fn add_file(&self, args: &AddFileArgs) -> Result<()> {
        args.validate()?;
        let content = match (&args.content, &args.path) {
            (Some(content), _) => content.clone(),
            (None, Some(path)) => tokio::fs::read(path).await.map_err(|err| {
                Error::NotValid(format!("cannot read {}: {err}", path.display()))
            })?,
            (None, None) => Vec::new(),
        };
        let path = self.api_path("files/");
        self.send(
            Method::POST,
            &path,
            &op_query("add"),
            Body::File {
                filename: &args.filename,
                content: &content,
            },
        )
        .await
        .map(|_| ())
    }

    /// Delete a stored file.
    pub async fn delete_file(&self, file: &File) -> Result<()> {
        self.delete(&file.resource_uri).await
    }

    /// Read a file's bytes: the inline content when present, otherwise a
    /// download from its anonymous URI.
    pub async fn read_file(&self, file: &File) -> Result<Vec<u8>> {
        if file.content.is_some() {
            return file.decoded_content();
        }
        self.send(Method::GET, &file.anon_uri, &[], Body::Empty).await
    }

    async fn fetch_version_info(&self) -> Result<VersionInfo> {
        let path = self.api_path("version/");
        let value = self
            .send_value(Method::GET, &path, &[], Body::Empty)
            .await
            .map_err(|err| match err {
                Error::NotFound(_) => Error::unsupported_version("controller", self.api_version),
                other => other,
            })?;
        self.read_with(&path, &value, VersionInfo::read)
    }

    fn api_path(&self, resource: &str) -> String {
        format!(
            "api/{}.{}/{resource}",
            self.api_version.major, self.api_version.minor
        )
    }

    /// Resolves `path` against the base URL. Relative paths are API paths;
    /// absolute paths are resource URIs as reported by the server.
    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|err| Error::InvalidEndpoint(format!("Invalid MAAS path `{path}`: {err}")))
    }

    async fn get_list<T: Resource>(
        &self,
        resource: &str,
        op: Option<&str>,
        params: &[(String, String)],
    ) -> Result<Vec<T>> {
        let path = self.api_path(resource);
        let mut query = op.map(op_query).unwrap_or_default();
        query.extend_from_slice(params);
        let value = self.send_value(Method::GET, &path, &query, Body::Empty).await?;
        self.read_with(&path, &value, T::read_list)
    }

    async fn post(&self, path: &str, op: &str, params: &Pairs) -> Result<Value> {
        self.send_value(Method::POST, path, &op_query(op), Body::Form(params))
            .await
    }

    async fn post_read<T: Resource>(
        &self,
        path: &str,
        op: Option<&str>,
        params: &Pairs,
    ) -> Result<T> {
        let query = op.map(op_query).unwrap_or_default();
        let value = self
            .send_value(Method::POST, path, &query, Body::Form(params))
            .await?;
        self.read_with(path, &value, T::read)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.send(Method::DELETE, path, &[], Body::Empty)
            .await
            .map(|_| ())
    }

    fn read_with<T>(
        &self,
        path: &str,
        value: &Value,
        read: impl FnOnce(ApiVersion, &Value) -> Result<T>,
    ) -> Result<T> {
        read(self.api_version, value).map_err(|err| {
            if err.should_log() {
                warn!(path, error = %err, "failed to read MAAS response");
            }
            err
        })
    }

    async fn send_value(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Body<'_>,
    ) -> Result<Value> {
        let bytes = self.send(method, path, query, body).await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes)
            .map_err(|err| Error::deserialization(format!("response for `{path}`"), err))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Body<'_>,
    ) -> Result<Vec<u8>> {
        let mut attempt = 0;

        loop {
            let url = self.endpoint(path)?;
            let request_id = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .header(ACCEPT, "application/json");

            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(authorizer) = &self.authorizer {
                request = request.header(AUTHORIZATION, authorizer.authorize(&method, &url)?);
            }
            request = match &body {
                Body::Empty => request,
                Body::Form(params) => request.form(*params),
                Body::File { filename, content } => {
                    let form = Form::new().text("filename", filename.to_string()).part(
                        "file",
                        Part::bytes(content.to_vec()).file_name(filename.to_string()),
                    );
                    request.multipart(form)
                }
            };

            info!(path, attempt, request_id, "MAAS request");

            let (error, retry_after) = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let retry_after = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|value| value.to_str().ok())
                        .and_then(parse_retry_after);
                    let bytes = response.bytes().await.map_err(|err| {
                        Error::HttpError(format!("Failed to read MAAS response body: {err}"))
                    })?;

                    if status.is_success() {
                        return Ok(if status == StatusCode::NO_CONTENT {
                            Vec::new()
                        } else {
                            bytes.to_vec()
                        });
                    }

                    let error = Error::from_status(status, String::from_utf8_lossy(&bytes));
                    (error, retry_after)
                }
                Err(err) => (Error::from(err), None),
            };

            if !error.is_retryable() || attempt >= self.retry_policy.max_retries {
                return Err(error);
            }

            attempt += 1;
            let delay = self.retry_policy.delay_with_hint(attempt, retry_after);
            debug!(path, attempt, request_id, ?delay, error = %error, "retrying MAAS request");
            if !delay.is_zero() {
                sleep(delay).await;
            }
        }
    }
}

fn op_query(op: &str) -> Pairs {
    vec![("op".to_string(), op.to_string())]
}

fn owned(pairs: Vec<(&'static str, String)>) -> Pairs {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
