//! Capabilities the request layer deliberately does not provide.
//!
//! Sessions, authentication, multipart parts, asynchronous processing, protocol upgrade,
//! request dispatch, connection details and cookies live outside this layer. Each is a
//! trait whose default methods return a fixed sentinel or an explicit error, and
//! [`Request`] implements every one of them with those defaults. An extension that
//! supplies the feature can implement the same trait on its own wrapper type.
//!
//! The handle types ([`Session`], [`Principal`], [`Part`], [`AsyncContext`],
//! [`UpgradeHandler`], [`RequestDispatcher`], [`Connection`]) are uninhabited, so an
//! `Option` of them can only ever be `None` here.

use cookie::Cookie;

use crate::{error::RequestError, request::Request};

/// HTTP session handle. Sessions are not supported.
#[derive(Debug)]
pub enum Session {}

/// Authenticated principal. Authentication is not supported.
#[derive(Debug)]
pub enum Principal {}

/// Multipart body part. Multipart parsing is not supported.
#[derive(Debug)]
pub enum Part {}

/// Asynchronous processing context. Async processing is not supported.
#[derive(Debug)]
pub enum AsyncContext {}

/// Protocol upgrade handler. Upgrades are not supported.
#[derive(Debug)]
pub enum UpgradeHandler {}

/// Forward/include dispatcher. Dispatch is not supported.
#[derive(Debug)]
pub enum RequestDispatcher {}

/// Underlying protocol connection. Not exposed.
#[derive(Debug)]
pub enum Connection {}

/// How the request reached its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatcherType {
  /// Delivered directly by the connector.
  #[default]
  Request,
}

const ASYNC_UNSUPPORTED: &str = "Async is not supported.";

pub trait SessionSupport {
  fn session(&self, _create: bool) -> Option<&Session> {
    None
  }

  fn requested_session_id(&self) -> Option<&str> {
    None
  }

  fn change_session_id(&mut self) -> Result<String, RequestError> {
    Err(RequestError::Unsupported("change_session_id"))
  }

  fn is_requested_session_id_valid(&self) -> bool {
    false
  }

  fn is_requested_session_id_from_cookie(&self) -> bool {
    false
  }

  fn is_requested_session_id_from_url(&self) -> bool {
    false
  }
}

pub trait AuthSupport {
  fn auth_type(&self) -> Option<&str> {
    None
  }

  fn remote_user(&self) -> Option<&str> {
    None
  }

  fn user_principal(&self) -> Option<&Principal> {
    None
  }

  fn is_user_in_role(&self, _role: &str) -> bool {
    false
  }

  /// Never authenticates anyone.
  fn authenticate(&mut self) -> Result<bool, RequestError> {
    Ok(false)
  }

  /// Fails rather than pretending the credentials were accepted.
  fn login(&mut self, _username: &str, _password: &str) -> Result<(), RequestError> {
    Err(RequestError::Unsupported("login"))
  }

  /// Nobody is ever logged in, so there is nothing to undo.
  fn logout(&mut self) -> Result<(), RequestError> {
    Ok(())
  }
}

pub trait MultipartSupport {
  fn parts(&self) -> Result<Vec<Part>, RequestError> {
    Ok(Vec::new())
  }

  fn part(&self, _name: &str) -> Result<Option<Part>, RequestError> {
    Ok(None)
  }
}

pub trait AsyncSupport {
  fn start_async(&mut self) -> Result<AsyncContext, RequestError> {
    Err(RequestError::IllegalState(ASYNC_UNSUPPORTED))
  }

  fn async_context(&self) -> Result<&AsyncContext, RequestError> {
    Err(RequestError::IllegalState(ASYNC_UNSUPPORTED))
  }

  fn is_async_started(&self) -> bool {
    false
  }

  fn is_async_supported(&self) -> bool {
    false
  }
}

pub trait UpgradeSupport {
  fn upgrade(&mut self) -> Result<Option<UpgradeHandler>, RequestError> {
    Ok(None)
  }
}

pub trait DispatchSupport {
  fn request_dispatcher(&self, _path: &str) -> Option<RequestDispatcher> {
    None
  }

  fn dispatcher_type(&self) -> DispatcherType {
    DispatcherType::Request
  }
}

pub trait ConnectionSupport {
  fn connection(&self) -> Result<&Connection, RequestError> {
    Err(RequestError::Unsupported("connection"))
  }
}

/// Cookie access. Cookie parsing is not part of this layer, so no cookies are reported.
pub trait CookieSupport {
  fn cookies(&self) -> Vec<Cookie<'static>> {
    Vec::new()
  }
}

impl SessionSupport for Request {}
impl AuthSupport for Request {}
impl MultipartSupport for Request {}
impl AsyncSupport for Request {}
impl UpgradeSupport for Request {}
impl DispatchSupport for Request {}
impl ConnectionSupport for Request {}
impl CookieSupport for Request {}
