//! Prints the urlshortener CustomResourceDefinitions as multi-document YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/urlshortener.yaml`

use crds::{Redirect, Shortlink};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    for crd in [Shortlink::crd(), Redirect::crd()] {
        print!("---\n{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
