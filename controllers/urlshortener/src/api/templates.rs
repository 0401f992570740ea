//! HTML pages served by the redirect handler
//!
//! Templates are compiled into the binary and rendered with minijinja.
//! Their `.html` names turn on HTML auto-escaping for every variable.

use minijinja::{Environment, context};

const REDIRECT_TEMPLATE: &str = include_str!("../../templates/redirect.html");
const NOT_FOUND_TEMPLATE: &str = include_str!("../../templates/404.html");
const INTERNAL_ERROR_TEMPLATE: &str = include_str!("../../templates/500.html");

const REDIRECT: &str = "redirect.html";
const NOT_FOUND: &str = "404.html";
const INTERNAL_ERROR: &str = "500.html";

/// Served when even the error template cannot be rendered
pub const FALLBACK_ERROR_BODY: &str = "Internal Server Error";

/// Compiled redirect, 404 and 500 pages
#[derive(Debug)]
pub struct Pages {
    env: Environment<'static>,
}

impl Pages {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(REDIRECT, REDIRECT_TEMPLATE)?;
        env.add_template(NOT_FOUND, NOT_FOUND_TEMPLATE)?;
        env.add_template(INTERNAL_ERROR, INTERNAL_ERROR_TEMPLATE)?;
        Ok(Self { env })
    }

    /// Page that forwards the browser to `redirect_to` after `redirect_after` seconds
    pub fn redirect(&self, redirect_from: &str, redirect_to: &str, redirect_after: u32) -> Result<String, minijinja::Error> {
        self.env.get_template(REDIRECT)?.render(context! {
            redirect_from => redirect_from,
            redirect_to => redirect_to,
            redirect_after => redirect_after,
        })
    }

    pub fn not_found(&self, path: &str) -> Result<String, minijinja::Error> {
        self.env.get_template(NOT_FOUND)?.render(context! { path => path })
    }

    pub fn internal_error(&self) -> Result<String, minijinja::Error> {
        self.env.get_template(INTERNAL_ERROR)?.render(context! {})
    }
}
