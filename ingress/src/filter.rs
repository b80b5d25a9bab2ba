use crate::ingress::IngressResource;
use getset::Getters;
use strum::IntoStaticStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Rejection {
    MissingClass,
    ForeignClass,
    Empty,
}

/// Decides whether an ingress belongs to this converter.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct ClassFilter {
    #[getset(get = "pub")]
    class: String,
}

impl ClassFilter {
    pub fn new<S: Into<String>>(class: S) -> Self {
        Self {
            class: class.into(),
        }
    }

    pub fn check(&self, ingress: &IngressResource) -> Result<(), Rejection> {
        match ingress.class() {
            None => return Err(Rejection::MissingClass),
            Some(class) if class != &self.class => return Err(Rejection::ForeignClass),
            Some(_) => {}
        }

        if ingress.default_backend().is_none() && ingress.rules().is_empty() {
            return Err(Rejection::Empty);
        }

        Ok(())
    }

    pub fn accepts(&self, ingress: &IngressResource) -> bool {
        self.check(ingress).is_ok()
    }
}
