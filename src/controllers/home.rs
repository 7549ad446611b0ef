//! `HomeController`, resolved through the injector.

use std::sync::Arc;

use axum::response::{Html, IntoResponse, Redirect, Response};
use minijinja::context;

use crate::controllers::greeting::Greeting;
use crate::dispatch::{DispatchError, RequestInfo};
use crate::injector::{ControllerDef, Resolver};
use crate::routing::UrlGenerator;
use crate::security::{
    SecurityContext, SessionHandle, AUTHENTICATION_ERROR, IS_AUTHENTICATED_FULLY, LAST_USERNAME,
};
use crate::templating::Templates;

pub struct HomeController {
    templates: Arc<Templates>,
    security: Arc<SecurityContext>,
}

impl HomeController {
    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<Response, DispatchError> {
        let html = self.templates.render(name, ctx, &self.security)?;
        Ok(Html(html).into_response())
    }

    fn index(&self, resolver: &Resolver<'_>) -> Result<Response, DispatchError> {
        let greeting = resolver.get::<dyn Greeting>()?.message();
        tracing::info!(greeting = %greeting, "Greeting resolved");

        self.render("index.html", context! { greeting => greeting })
    }

    fn login(&self, resolver: &Resolver<'_>) -> Result<Response, DispatchError> {
        if self.security.is_granted(IS_AUTHENTICATED_FULLY) {
            let home = resolver.get::<UrlGenerator>()?.generate("home", &[])?;
            return Ok(Redirect::to(&home).into_response());
        }

        let session = resolver.get::<SessionHandle>()?;
        let request = resolver.get::<RequestInfo>()?;

        self.render(
            "login.html",
            context! {
                error => session.remove(AUTHENTICATION_ERROR),
                last_username => session.get(LAST_USERNAME),
                request_id => request.request_id.clone(),
            },
        )
    }

    fn account(&self, resolver: &Resolver<'_>) -> Result<Response, DispatchError> {
        let section = resolver.param("section")?;
        let user = self
            .security
            .user()
            .ok_or_else(|| DispatchError::Action("account page needs a user".to_string()))?;

        self.render(
            "account.html",
            context! {
                section => section,
                username => &user.username,
                email => &user.email,
                roles => self.security.roles(),
            },
        )
    }
}

pub fn definition() -> ControllerDef<HomeController> {
    ControllerDef::new("HomeController", |resolver| {
        Ok(HomeController {
            templates: resolver.get::<Templates>()?,
            security: resolver.get::<SecurityContext>()?,
        })
    })
    .requires::<Templates>()
    .requires::<SecurityContext>()
    .requires::<dyn Greeting>()
    .requires::<UrlGenerator>()
    .requires::<SessionHandle>()
    .requires::<RequestInfo>()
    .action("indexAction", |home: &HomeController, resolver| home.index(resolver))
    .action("loginAction", |home: &HomeController, resolver| home.login(resolver))
    .action("accountAction", |home: &HomeController, resolver| home.account(resolver))
}
