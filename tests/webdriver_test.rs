use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

use cookie_refresher::RefreshError;
use cookie_refresher::browser::{Browser, BrowserLauncher, FirefoxOptions, Locator, WebDriverLauncher};
use cookie_refresher::cookies::Cookie;

const SESSION_PATH: &str = "/session/abc123";

fn start_session(server: &mut ServerGuard) -> (mockito::Mock, mockito::Mock) {
    let create = server
        .mock("POST", "/session")
        .match_body(Matcher::PartialJson(json!({
            "capabilities": { "alwaysMatch": { "browserName": "firefox" } }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "value": { "sessionId": "abc123", "capabilities": {} } }).to_string())
        .create();
    let delete = server
        .mock("DELETE", SESSION_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "value": null }).to_string())
        .expect(1)
        .create();
    (create, delete)
}

fn launcher(server: &ServerGuard) -> WebDriverLauncher {
    WebDriverLauncher::new(format!("{}/", server.url()), FirefoxOptions::default()).unwrap()
}

#[test]
fn launch_creates_and_quit_deletes_session() {
    let mut server = Server::new();
    let (create, delete) = start_session(&mut server);

    let mut session = launcher(&server).launch().unwrap();
    assert_eq!(session.id(), "abc123");
    session.quit().unwrap();
    // a second quit and the drop must not send another DELETE
    session.quit().unwrap();
    drop(session);

    create.assert();
    delete.assert();
}

#[test]
fn dropping_a_session_deletes_it() {
    let mut server = Server::new();
    let (_create, delete) = start_session(&mut server);

    drop(launcher(&server).launch().unwrap());

    delete.assert();
}

#[test]
fn navigation_and_cookies() {
    let mut server = Server::new();
    let (_create, _delete) = start_session(&mut server);
    let goto = server
        .mock("POST", format!("{SESSION_PATH}/url").as_str())
        .match_body(Matcher::Json(json!({ "url": "https://www.instagram.com/" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value": null}"#)
        .create();
    let _url = server
        .mock("GET", format!("{SESSION_PATH}/url").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value": "https://www.instagram.com/accounts/login/"}"#)
        .create();
    let add = server
        .mock("POST", format!("{SESSION_PATH}/cookie").as_str())
        .match_body(Matcher::PartialJson(json!({
            "cookie": { "name": "sessionid", "value": "s1", "domain": ".instagram.com", "httpOnly": false }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value": null}"#)
        .create();
    let _jar = server
        .mock("GET", format!("{SESSION_PATH}/cookie").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "value": [{
                "name": "csrftoken",
                "value": "t0k3n",
                "domain": ".instagram.com",
                "path": "/",
                "secure": true,
                "httpOnly": false,
                "expiry": 1900000000,
                "sameSite": "Lax"
            }] })
            .to_string(),
        )
        .create();

    let mut session = launcher(&server).launch().unwrap();
    session.goto("https://www.instagram.com/").unwrap();
    assert_eq!(
        session.current_url().unwrap(),
        "https://www.instagram.com/accounts/login/"
    );
    session
        .add_cookie(&Cookie::new("sessionid", "s1", ".instagram.com"))
        .unwrap();
    let jar = session.cookies().unwrap();
    session.quit().unwrap();

    goto.assert();
    add.assert();
    assert_eq!(jar.len(), 1);
    assert_eq!(jar[0].name, "csrftoken");
    assert!(jar[0].secure);
    assert_eq!(jar[0].expiry, Some(1_900_000_000));
}

#[test]
fn find_click_and_type() {
    let mut server = Server::new();
    let (_create, _delete) = start_session(&mut server);
    let _find = server
        .mock("POST", format!("{SESSION_PATH}/element").as_str())
        .match_body(Matcher::Json(json!({ "using": "css selector", "value": "input[name='username']" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value": {"element-6066-11e4-a52e-4f735466cecf": "el-7"}}"#)
        .create();
    let click = server
        .mock("POST", format!("{SESSION_PATH}/element/el-7/click").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value": null}"#)
        .create();
    let typed = server
        .mock("POST", format!("{SESSION_PATH}/element/el-7/value").as_str())
        .match_body(Matcher::Json(json!({ "text": "alice" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value": null}"#)
        .create();

    let mut session = launcher(&server).launch().unwrap();
    let element = session
        .find_element(&Locator::css("input[name='username']"))
        .unwrap();
    assert_eq!(element.0, "el-7");
    session.click(&element).unwrap();
    session.send_keys(&element, "alice").unwrap();
    session.quit().unwrap();

    click.assert();
    typed.assert();
}

#[test]
fn missing_element_maps_to_element_not_found() {
    let mut server = Server::new();
    let (_create, _delete) = start_session(&mut server);
    let _find = server
        .mock("POST", format!("{SESSION_PATH}/element").as_str())
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "value": {
                "error": "no such element",
                "message": "Unable to locate element",
                "stacktrace": ""
            } })
            .to_string(),
        )
        .create();

    let mut session = launcher(&server).launch().unwrap();
    let err = session
        .find_element(&Locator::xpath("//button[contains(text(), 'Not Now')]"))
        .unwrap_err();
    session.quit().unwrap();

    match err {
        RefreshError::ElementNotFound(what) => assert!(what.contains("Not Now")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn session_creation_failure_maps_to_webdriver_error() {
    let mut server = Server::new();
    let _create = server
        .mock("POST", "/session")
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "value": {
                "error": "session not created",
                "message": "Process unexpectedly closed with status 1"
            } })
            .to_string(),
        )
        .create();

    let err = launcher(&server).launch().unwrap_err();

    assert!(matches!(
        err,
        RefreshError::WebDriver { ref error, .. } if error == "session not created"
    ));
    assert!(err.is_retryable());
}

#[test]
fn capabilities_are_sent_with_firefox_prefs() {
    let mut server = Server::new();
    let create = server
        .mock("POST", "/session")
        .match_body(Matcher::PartialJson(json!({
            "capabilities": { "alwaysMatch": { "moz:firefoxOptions": {
                "args": ["-headless"],
                "prefs": { "permissions.default.image": 2 }
            } } }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value": {"sessionId": "abc123"}}"#)
        .create();
    let _delete = server
        .mock("DELETE", SESSION_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value": null}"#)
        .create();

    let mut session = launcher(&server).launch().unwrap();
    session.quit().unwrap();

    create.assert();
}
