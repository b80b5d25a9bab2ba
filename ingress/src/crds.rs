use kube::CustomResourceExt;
use std::io::Write;
use thiserror::Error;
use vg_api::v1alpha1::{Route, Upstream};

#[derive(Debug, Error)]
pub enum CrdsError {
    #[error("Unable to render CRD: {0}")]
    Render(#[from] serde_yaml::Error),
    #[error("Unable to write CRD: {0}")]
    Write(#[from] std::io::Error),
}

/// Writes the `Upstream` and `Route` definitions as a multi-document YAML stream.
pub fn write_crds<W: Write>(writer: &mut W) -> Result<(), CrdsError> {
    for crd in [Upstream::crd(), Route::crd()] {
        writer.write_all(b"---\n")?;
        writer.write_all(serde_yaml::to_string(&crd)?.as_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
    use serde::Deserialize;

    #[test]
    fn test_write_crds() {
        let mut output = Vec::new();
        write_crds(&mut output).expect("CRDs should render");
        let output = String::from_utf8(output).expect("Output should be UTF-8");

        let names: Vec<String> = serde_yaml::Deserializer::from_str(&output)
            .map(|document| {
                CustomResourceDefinition::deserialize(document)
                    .expect("Document should be a CRD")
                    .metadata
                    .name
                    .unwrap_or_default()
            })
            .collect();

        assert_eq!(
            names,
            vec![
                "upstreams.vale-gateway.whitefamily.in",
                "routes.vale-gateway.whitefamily.in"
            ]
        );
    }
}
