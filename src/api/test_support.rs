//! Shared setup for handler tests: an in-memory store seeded with one HR
//! user, one department with its lead and an employee, and a lead of
//! another department.

use std::sync::Arc;

use crate::{
    auth::jwt::generate_access_token,
    config::Config,
    model::{leave_type::LeaveTypeInput, role::Role},
    store::{AppState, BalanceRepository, LeaveTypeRepository, memory::MemoryStore},
};

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    pub config: Config,
    pub hr_id: u64,
    pub lead_id: u64,
    pub employee_id: u64,
    pub outsider_id: u64,
    pub department: u64,
    pub annual: u64,
    pub hr_token: String,
    pub lead_token: String,
    pub employee_token: String,
    pub outsider_token: String,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let config = Config::for_tests();

        let hr_id = store.add_user("hana", "", Role::Hr, None);
        let lead_id = store.add_user("lena", "", Role::TeamLead, None);
        let department = store.add_department("Engineering", vec![lead_id]);
        store.set_department(lead_id, department);
        let employee_id = store.add_user("emil", "", Role::Employee, Some(department));

        let outsider_id = store.add_user("olaf", "", Role::TeamLead, None);
        let sales = store.add_department("Sales", vec![outsider_id]);
        store.set_department(outsider_id, sales);

        let annual = LeaveTypeRepository::create(
            &*store,
            &LeaveTypeInput {
                name: "Annual".to_string(),
                description: String::new(),
                max_days_per_year: 20,
            },
        )
        .await
        .unwrap();
        BalanceRepository::upsert(&*store, employee_id, annual, 10.0)
            .await
            .unwrap();

        let token = |id: u64, name: &str, role: Role| {
            generate_access_token(id, name, role, &config.jwt_secret, config.access_token_ttl)
                .unwrap()
        };

        Self {
            state: AppState::from_store(store.clone()),
            hr_token: token(hr_id, "hana", Role::Hr),
            lead_token: token(lead_id, "lena", Role::TeamLead),
            employee_token: token(employee_id, "emil", Role::Employee),
            outsider_token: token(outsider_id, "olaf", Role::TeamLead),
            store,
            config,
            hr_id,
            lead_id,
            employee_id,
            outsider_id,
            department,
            annual,
        }
    }
}

/// Builds the full application, routes and middleware included.
macro_rules! test_app {
    ($fx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($fx.state.clone()))
                .app_data(actix_web::web::Data::new($fx.config.clone()))
                .configure(|cfg| $crate::routes::configure(cfg, $fx.config.clone())),
        )
        .await
    };
}

/// Sends a request and returns the status with the JSON body (`Null` when
/// empty). An empty token sends no Authorization header.
macro_rules! call {
    ($app:expr, $method:expr, $uri:expr, $token:expr, $body:expr) => {{
        let mut req = actix_web::test::TestRequest::default()
            .method($method)
            .uri($uri)
            .peer_addr("127.0.0.1:12345".parse().unwrap());
        let token: &str = $token;
        if !token.is_empty() {
            req = req.insert_header(("Authorization", format!("Bearer {token}")));
        }
        let body: Option<serde_json::Value> = $body;
        if let Some(body) = body {
            req = req.set_json(body);
        }
        let resp = actix_web::test::call_service($app, req.to_request()).await;
        let status = resp.status();
        let bytes = actix_web::test::read_body(resp).await;
        let json: serde_json::Value =
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }};
}

pub(crate) use call;
pub(crate) use test_app;
