//! Static routes between subnets.

use maas_core::{check_fields, ApiVersion, Checker, Error, FieldMap, Readers, Resource, Result};
use serde_json::Value;

use crate::subnet::{Subnet, SUBNETS};

/// A route MAAS configures on deployed machines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticRoute {
    /// Database id.
    pub id: i64,
    /// Canonical API path.
    pub resource_uri: String,
    /// Subnet the route applies to.
    pub source: Subnet,
    /// Subnet the route reaches.
    pub destination: Subnet,
    /// Next hop address.
    pub gateway_ip: String,
    /// Route metric.
    pub metric: i64,
}

pub(crate) static STATIC_ROUTES: Readers<StaticRoute> =
    Readers::new("static route", &[(ApiVersion::V2_0, static_route_2_0)]);

impl Resource for StaticRoute {
    fn readers() -> &'static Readers<Self> {
        &STATIC_ROUTES
    }
}

fn static_route_2_0(version: ApiVersion, source: &Value) -> Result<StaticRoute> {
    let fields = FieldMap::new()
        .required("resource_uri", Checker::String)
        .required("id", Checker::ForceInt)
        .required("source", Checker::object())
        .required("destination", Checker::object())
        .required("gateway_ip", Checker::String)
        .required("metric", Checker::ForceInt);
    let record = check_fields(&fields, source, "static route 2.0 schema check failed")?;

    // Both ends are read as one subnet batch.
    let ends = Value::Array(vec![
        record.value("source")?.clone(),
        record.value("destination")?.clone(),
    ]);
    let [from, to]: [Subnet; 2] = SUBNETS
        .read_list(version, &ends)
        .map_err(|err| err.annotate("source and destination"))?
        .try_into()
        .map_err(|batch: Vec<Subnet>| {
            Error::Deserialization(format!(
                "static route: expected 2 subnets, got {}",
                batch.len()
            ))
        })?;

    Ok(StaticRoute {
        id: record.int("id")?,
        resource_uri: record.string("resource_uri")?,
        source: from,
        destination: to,
        gateway_ip: record.string("gateway_ip")?,
        metric: record.int("metric")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subnet::tests::subnet_json;
    use serde_json::json;

    fn route_json() -> Value {
        json!({
            "id": 2,
            "resource_uri": "/MAAS/api/2.0/static-routes/2/",
            "source": subnet_json(1, "192.168.0.0/24"),
            "destination": subnet_json(3, "10.0.0.0/8"),
            "gateway_ip": "192.168.0.1",
            "metric": 0
        })
    }

    #[test]
    fn reads_route_with_both_subnets() {
        let route = StaticRoute::read(ApiVersion::V2_0, &route_json()).unwrap();
        assert_eq!(route.source.id, 1);
        assert_eq!(route.destination.cidr, "10.0.0.0/8");
        assert_eq!(route.gateway_ip, "192.168.0.1");
        assert_eq!(route.metric, 0);
    }

    #[test]
    fn bad_destination_names_its_batch_index() {
        let mut source = route_json();
        source["destination"]["cidr"] = Value::Null;
        let err = StaticRoute::read(ApiVersion::V2_0, &source).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Deserialization error: source and destination: subnet 1: \
             subnet 2.0 schema check failed: cidr: expected string, got null"
        );
    }
}
