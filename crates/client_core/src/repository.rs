use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::EmployeeId,
    error::ApiErrorBody,
    protocol::{Employee, PayrollEnvelope, PayrollReport, ResponseEnvelope},
};
use tracing::debug;
use url::Url;

use crate::error::RepositoryError;

/// Remote record service. Implementations unwrap response envelopes; callers
/// only ever see plain records.
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn list_employees(&self) -> Result<Vec<Employee>, RepositoryError>;
    async fn get_employee(&self, id: EmployeeId) -> Result<Employee, RepositoryError>;
    async fn create_employee(&self, draft: &Employee) -> Result<Employee, RepositoryError>;
    async fn update_employee(
        &self,
        id: EmployeeId,
        employee: &Employee,
    ) -> Result<Employee, RepositoryError>;
    async fn delete_employee(&self, id: EmployeeId) -> Result<(), RepositoryError>;
    async fn payroll_report(&self) -> Result<PayrollReport, RepositoryError>;
    async fn employee_payroll(&self, id: EmployeeId) -> Result<PayrollReport, RepositoryError>;
}

pub struct HttpEmployeeRepository {
    http: Client,
    base_url: String,
}

impl HttpEmployeeRepository {
    pub fn new(base_url: &Url, timeout: Option<Duration>) -> Result<Self, RepositoryError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|err| RepositoryError::Transport {
            url: base_url.to_string(),
            reason: format!("failed to build http client: {err}"),
        })?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: &Url) -> Self {
        Self {
            http,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Response, RepositoryError> {
        let mut request = self.http.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|err| RepositoryError::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(ApiErrorBody::into_message);
            return Err(RepositoryError::Status {
                method: method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        debug!(%method, url, status = status.as_u16(), "repository request settled");
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(
        url: &str,
        response: Response,
    ) -> Result<T, RepositoryError> {
        response
            .json::<T>()
            .await
            .map_err(|err| RepositoryError::Decode {
                url: url.to_string(),
                reason: err.to_string(),
            })
    }

    async fn get_record<T: DeserializeOwned>(&self, url: &str) -> Result<T, RepositoryError> {
        let response = self.send::<()>(Method::GET, url, None).await?;
        let envelope: ResponseEnvelope<T> = Self::decode(url, response).await?;
        Ok(envelope.into_inner())
    }

    async fn get_payroll(&self, url: &str) -> Result<PayrollReport, RepositoryError> {
        let response = self.send::<()>(Method::GET, url, None).await?;
        let envelope: PayrollEnvelope = Self::decode(url, response).await?;
        Ok(envelope.into_report()?)
    }
}

#[async_trait]
impl EmployeeRepository for HttpEmployeeRepository {
    async fn list_employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        self.get_record(&self.endpoint("employees")).await
    }

    async fn get_employee(&self, id: EmployeeId) -> Result<Employee, RepositoryError> {
        self.get_record(&self.endpoint(&format!("employees/{id}"))).await
    }

    async fn create_employee(&self, draft: &Employee) -> Result<Employee, RepositoryError> {
        let url = self.endpoint("employees");
        let body = draft.as_draft();
        let response = self.send(Method::POST, &url, Some(&body)).await?;
        let envelope: ResponseEnvelope<Employee> = Self::decode(&url, response).await?;
        Ok(envelope.into_inner())
    }

    async fn update_employee(
        &self,
        id: EmployeeId,
        employee: &Employee,
    ) -> Result<Employee, RepositoryError> {
        let url = self.endpoint(&format!("employees/{id}"));
        let response = self.send(Method::PUT, &url, Some(employee)).await?;
        let envelope: ResponseEnvelope<Employee> = Self::decode(&url, response).await?;
        Ok(envelope.into_inner())
    }

    async fn delete_employee(&self, id: EmployeeId) -> Result<(), RepositoryError> {
        let url = self.endpoint(&format!("employees/{id}"));
        self.send::<()>(Method::DELETE, &url, None).await?;
        Ok(())
    }

    async fn payroll_report(&self) -> Result<PayrollReport, RepositoryError> {
        self.get_payroll(&self.endpoint("payroll")).await
    }

    async fn employee_payroll(&self, id: EmployeeId) -> Result<PayrollReport, RepositoryError> {
        self.get_payroll(&self.endpoint(&format!("employees/{id}/payroll"))).await
    }
}

#[cfg(test)]
#[path = "tests/repository_tests.rs"]
mod tests;
