pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "vg-ingress";
pub const MANAGED_BY_LABEL_QUERY: &str = "app.kubernetes.io/managed-by=vg-ingress";

pub const GROUP: &str = "vale-gateway.whitefamily.in";
pub const UPSTREAM_CRD_KIND: &str = "Upstream";
pub const ROUTE_CRD_KIND: &str = "Route";

/// Label carrying the (possibly shortened) name of the ingress an object was derived from.
pub const INGRESS_OWNER_LABEL: &str = "vale-gateway.whitefamily.in/ingress";

pub const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";
pub const DEFAULT_INGRESS_CLASS: &str = "vale-gateway";
