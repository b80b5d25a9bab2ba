use getset::Getters;
use kube::{Resource, ResourceExt};
use std::fmt::{Display, Formatter, Write};
use thiserror::Error;
use typed_builder::TypedBuilder;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectRefError {
    #[error("Object is missing a name")]
    MissingName,
    #[error("Object {0} is missing a namespace")]
    MissingNamespace(String),
}

/// Identifies a namespaced object by kind, namespace and name.
#[derive(TypedBuilder, Getters, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    #[getset(get = "pub")]
    #[builder(setter(into))]
    kind: String,

    #[getset(get = "pub")]
    #[builder(setter(into))]
    namespace: String,

    #[getset(get = "pub")]
    #[builder(setter(into))]
    name: String,
}

impl Display for ObjectRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())?;
        f.write_char('/')?;
        f.write_str(self.namespace())?;
        f.write_char('/')?;
        f.write_str(self.name())
    }
}

impl ObjectRef {
    pub fn of_kind<K: Resource>() -> ObjectRefBuilder<((String,), (), ())>
    where
        K::DynamicType: 'static + Default,
    {
        let dynamic_type = K::DynamicType::default();
        ObjectRef::builder().kind(K::kind(&dynamic_type))
    }

    pub fn for_object<K: Resource + ResourceExt>(object: &K) -> Result<Self, ObjectRefError>
    where
        K::DynamicType: 'static + Default,
    {
        let name = object
            .meta()
            .name
            .clone()
            .ok_or(ObjectRefError::MissingName)?;
        let namespace = object
            .namespace()
            .ok_or_else(|| ObjectRefError::MissingNamespace(name.clone()))?;

        Ok(Self::of_kind::<K>().namespace(namespace).name(name).build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::networking::v1::Ingress;
    use kube::api::ObjectMeta;

    fn ingress(name: Option<&str>, namespace: Option<&str>) -> Ingress {
        Ingress {
            metadata: ObjectMeta {
                name: name.map(ToString::to_string),
                namespace: namespace.map(ToString::to_string),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_for_object() {
        let object_ref = ObjectRef::for_object(&ingress(Some("shop"), Some("default")))
            .expect("Ingress should have a reference");

        assert_eq!(object_ref.kind(), "Ingress");
        assert_eq!(object_ref.namespace(), "default");
        assert_eq!(object_ref.name(), "shop");
        assert_eq!(object_ref.to_string(), "Ingress/default/shop");
    }

    #[test]
    fn test_for_object_without_name() {
        let result = ObjectRef::for_object(&ingress(None, Some("default")));
        assert_eq!(result, Err(ObjectRefError::MissingName));
    }

    #[test]
    fn test_for_object_without_namespace() {
        let result = ObjectRef::for_object(&ingress(Some("shop"), None));
        assert_eq!(
            result,
            Err(ObjectRefError::MissingNamespace("shop".to_string()))
        );
    }

    #[test]
    fn test_ordering_groups_by_namespace() {
        let a = ObjectRef::of_kind::<Ingress>()
            .namespace("a")
            .name("z")
            .build();
        let b = ObjectRef::of_kind::<Ingress>()
            .namespace("b")
            .name("a")
            .build();

        assert!(a < b);
    }
}
