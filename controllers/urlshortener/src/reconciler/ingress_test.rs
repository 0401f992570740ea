//! Unit tests for Ingress construction

#[cfg(test)]
mod tests {
    use super::super::ingress::*;
    use crate::test_utils::*;
    use crds::RedirectCode;
    use kube::ResourceExt;

    #[test]
    fn test_labels_and_selector() {
        let labels = labels_for_redirect("old-site");
        assert_eq!(labels["app"], "urlshortener");
        assert_eq!(labels["redirect"], "old-site");
        assert_eq!(label_selector_for_redirect("old-site"), "app=urlshortener,redirect=old-site");
    }

    #[test]
    fn test_tls_secret_name() {
        assert_eq!(tls_secret_name("a.b.com"), "a-b-com-redirect-secret");
        assert_eq!(tls_secret_name("localhost"), "localhost-redirect-secret");
    }

    #[test]
    fn test_annotations_use_normalized_target() {
        let redirect = create_test_redirect("old", "old.example.com", "example.com");
        let ingress = build_redirect_ingress(&redirect);
        let annotations = ingress.annotations();

        assert_eq!(annotations[REWRITE_TARGET_ANNOTATION], "/");
        assert_eq!(annotations[PERMANENT_REDIRECT_ANNOTATION], "http://example.com$request_uri");
        assert_eq!(annotations[PERMANENT_REDIRECT_CODE_ANNOTATION], "308");
        assert_eq!(redirect_target_of(&ingress).as_deref(), Some("http://example.com$request_uri"));
    }

    #[test]
    fn test_target_with_scheme_passes_through() {
        let mut redirect = create_test_redirect("old", "old.example.com", "https://example.com");
        redirect.spec.code = RedirectCode::new(301).unwrap();
        let ingress = build_redirect_ingress(&redirect);

        assert_eq!(ingress.annotations()[PERMANENT_REDIRECT_ANNOTATION], "https://example.com");
        assert_eq!(ingress.annotations()[PERMANENT_REDIRECT_CODE_ANNOTATION], "301");
    }

    #[test]
    fn test_single_prefix_rule_to_placeholder_backend() {
        let redirect = create_test_redirect("old", "old.example.com", "example.com");
        let ingress = build_redirect_ingress(&redirect);

        assert_eq!(ingress.name_any(), "old");
        assert_eq!(ingress.namespace().as_deref(), Some(TEST_NAMESPACE));
        assert_eq!(ingress.labels(), &labels_for_redirect("old"));

        let spec = ingress.spec.unwrap();
        assert_eq!(spec.ingress_class_name.as_deref(), Some("nginx"));
        assert!(spec.tls.is_none());

        let rules = spec.rules.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].host.as_deref(), Some("old.example.com"));
        let paths = &rules[0].http.as_ref().unwrap().paths;
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].path.as_deref(), Some("/"));
        assert_eq!(paths[0].path_type, "Prefix");
        let service = paths[0].backend.service.as_ref().unwrap();
        assert_eq!(service.name, BACKEND_SERVICE_NAME);
        assert_eq!(service.port.as_ref().unwrap().number, Some(80));
    }

    #[test]
    fn test_owner_reference_points_at_redirect() {
        let redirect = create_test_redirect("old", "old.example.com", "example.com");
        let ingress = build_redirect_ingress(&redirect);
        let owners = ingress.owner_references();

        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].kind, "Redirect");
        assert_eq!(owners[0].name, "old");
        assert_eq!(owners[0].uid, "uid-old");
        assert_eq!(owners[0].controller, Some(true));
    }

    #[test]
    fn test_tls_enabled_adds_entry_and_merges_annotations() {
        let mut redirect = create_test_redirect("ab", "a.b.com", "example.com");
        redirect.spec.tls.enable = true;
        redirect
            .spec
            .tls
            .annotations
            .insert("cert-manager.io/cluster-issuer".to_string(), "letsencrypt".to_string());
        redirect
            .spec
            .tls
            .annotations
            .insert(REWRITE_TARGET_ANNOTATION.to_string(), "/landing".to_string());

        let ingress = build_redirect_ingress(&redirect);
        let tls = ingress.spec.as_ref().unwrap().tls.clone().unwrap();
        assert_eq!(tls.len(), 1);
        assert_eq!(tls[0].hosts, Some(vec!["a.b.com".to_string()]));
        assert_eq!(tls[0].secret_name.as_deref(), Some("a-b-com-redirect-secret"));

        let annotations = ingress.annotations();
        assert_eq!(annotations["cert-manager.io/cluster-issuer"], "letsencrypt");
        assert_eq!(annotations[REWRITE_TARGET_ANNOTATION], "/landing");
    }

    #[test]
    fn test_tls_annotations_ignored_when_disabled() {
        let mut redirect = create_test_redirect("ab", "a.b.com", "example.com");
        redirect
            .spec
            .tls
            .annotations
            .insert("cert-manager.io/cluster-issuer".to_string(), "letsencrypt".to_string());
        let ingress = build_redirect_ingress(&redirect);
        assert!(!ingress.annotations().contains_key("cert-manager.io/cluster-issuer"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let redirect = create_test_redirect("old", "old.example.com", "example.com");
        let first = build_redirect_ingress(&redirect);
        let second = build_redirect_ingress(&redirect);
        assert_eq!(first, second);
        assert!(ingress_matches(&first, &second));
    }

    #[test]
    fn test_ingress_matches_detects_drift() {
        let redirect = create_test_redirect("old", "old.example.com", "example.com");
        let desired = build_redirect_ingress(&redirect);

        let mut edited = desired.clone();
        edited
            .annotations_mut()
            .insert(PERMANENT_REDIRECT_ANNOTATION.to_string(), "https://evil.example".to_string());
        assert!(!ingress_matches(&edited, &desired));

        let mut stored = desired.clone();
        stored.metadata.resource_version = Some("12".to_string());
        assert!(ingress_matches(&stored, &desired));
    }

    #[test]
    fn test_ingress_names_sorted() {
        let a = build_redirect_ingress(&create_test_redirect("b", "b.example.com", "x"));
        let b = build_redirect_ingress(&create_test_redirect("a", "a.example.com", "x"));
        assert_eq!(ingress_names(&[a, b]), ["a", "b"]);
    }
}
