//! GT CAS login against a separate CAS host.

use httpmock::prelude::*;
use serde_json::json;

use nelson_client::{Authenticator, IdProvider, NelsonError, ScriptedPrompt};

const LOGIN_PAGE: &str = r#"<!DOCTYPE html>
<html><body>
<form id="fm1" action="/cas/login?service=svc" method="post">
  <input id="username" name="username" type="text" />
  <input id="password" name="password" type="password" />
  <input type="hidden" name="lt" value="LT-1-xyz" />
  <input type="hidden" name="execution" value="e1s1" />
  <input type="hidden" name="_eventId" value="submit" />
</form>
</body></html>"#;

/// Service redirects `/auth/cas` to the CAS host, which serves the form.
fn mock_cas_entry(service: &MockServer, cas: &MockServer) {
    let login = cas.url("/cas/login?service=svc");
    service.mock(|when, then| {
        when.method(GET).path("/auth/cas");
        then.status(302).header("location", login.as_str());
    });
    cas.mock(|when, then| {
        when.method(GET).path("/cas/login");
        then.status(200).header("content-type", "text/html").body(LOGIN_PAGE);
    });
}

#[test]
fn cas_login_lands_on_service_and_exchanges_token() {
    let service = MockServer::start();
    let cas = MockServer::start();
    mock_cas_entry(&service, &cas);

    let ticket_url = service.url("/auth/cas/callback?ticket=ST-1");
    let post = cas.mock(|when, then| {
        when.method(POST)
            .path("/cas/login")
            .form_urlencoded_tuple("lt", "LT-1-xyz")
            .form_urlencoded_tuple("execution", "e1s1")
            .form_urlencoded_tuple("_eventId", "submit")
            .form_urlencoded_tuple("warn", "false")
            .form_urlencoded_tuple("username", "gburdell3")
            .form_urlencoded_tuple("password", "buzz");
        then.status(302).header("location", ticket_url.as_str());
    });
    service.mock(|when, then| {
        when.method(GET).path("/auth/cas/callback").query_param("ticket", "ST-1");
        then.status(200).header("set-cookie", "session=gt; Path=/");
    });
    let exchange = service.mock(|when, then| {
        when.method(POST).path("/auth_tokens").header("cookie", "session=gt");
        then.status(200).json_body(json!({"auth_token": "jwt-gt"}));
    });

    let mut prompt = ScriptedPrompt::new(["gburdell3", "buzz"]);
    let token = Authenticator::new(service.base_url())
        .login(IdProvider::Gt, &mut prompt)
        .unwrap();

    assert_eq!(token, "jwt-gt");
    assert_eq!(prompt.asked(), ["Username", "Password"]);
    post.assert();
    exchange.assert();
}

#[test]
fn staying_on_cas_is_rejected_as_bad_credentials() {
    let service = MockServer::start();
    let cas = MockServer::start();
    mock_cas_entry(&service, &cas);

    cas.mock(|when, then| {
        when.method(POST).path("/cas/login");
        then.status(200).body("<html>Duo two-factor required</html>");
    });
    let exchange = service.mock(|when, then| {
        when.method(POST).path("/auth_tokens");
        then.status(200).json_body(json!({"auth_token": "never"}));
    });

    let mut prompt = ScriptedPrompt::new(["gburdell3", "wrong"]);
    let err = Authenticator::new(service.base_url())
        .login(IdProvider::Gt, &mut prompt)
        .unwrap_err();

    assert_eq!(err.to_string(), "Username and password failed (Do you use two-factor?)");
    exchange.assert_calls(0);
}

#[test]
fn unexpected_login_page_is_reported() {
    let service = MockServer::start();
    let cas = MockServer::start();
    let login = cas.url("/cas/login");
    service.mock(|when, then| {
        when.method(GET).path("/auth/cas");
        then.status(302).header("location", login.as_str());
    });
    cas.mock(|when, then| {
        when.method(GET).path("/cas/login");
        then.status(200).body("<html>Scheduled maintenance</html>");
    });

    let mut prompt = ScriptedPrompt::new(["u", "p"]);
    let err = Authenticator::new(service.base_url())
        .login(IdProvider::Gt, &mut prompt)
        .unwrap_err();

    assert!(matches!(err, NelsonError::LoginPageChanged(_)));
}

#[test]
fn forbidden_cas_entry_is_authentication_error() {
    let service = MockServer::start();
    service.mock(|when, then| {
        when.method(GET).path("/auth/cas");
        then.status(403);
    });

    let mut prompt = ScriptedPrompt::new(["u", "p"]);
    let err = Authenticator::new(service.base_url())
        .login(IdProvider::Gt, &mut prompt)
        .unwrap_err();

    assert!(matches!(err, NelsonError::Authentication(_)));
}
