use crate::{
    api::{dtr, employee, payroll},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use std::sync::Arc;

pub type Limiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per client IP limiter, shared by every worker.
pub fn build_limiter(requests_per_min: u32) -> anyhow::Result<Arc<Limiter>> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        60_000 / requests_per_min as u64
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms.max(1))
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit of {requests_per_min} per minute"))?;
    Ok(Arc::new(Governor::new(&cfg)))
}

/// Mounts the API under the configured prefix.
pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiter: Arc<Limiter>) {
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(limiter) // rate limiting
            .configure(api_routes),
    );
}

pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/dtr")
            // /dtr
            .service(web::resource("").route(web::post().to(dtr::upload_dtr)))
            // /dtr/months
            .service(web::resource("/months").route(web::get().to(dtr::list_months))),
    )
    .service(
        web::scope("/payroll")
            // /payroll/compute
            .service(web::resource("/compute").route(web::post().to(payroll::compute_payroll))),
    )
    .service(
        web::scope("/payslip")
            // /payslip
            .service(web::resource("").route(web::get().to(payroll::get_payslip)))
            // /payslip/latest
            .service(web::resource("/latest").route(web::get().to(payroll::latest_payslip)))
            // /payslip/summary
            .service(web::resource("/summary").route(web::post().to(payroll::payslip_summary))),
    )
    .service(
        web::scope("/employee")
            // /employee
            .service(web::resource("").route(web::post().to(employee::create_employee)))
            // /employee/{id}
            .service(web::resource("/{id}").route(web::get().to(employee::get_employee)))
            // /employee/{id}/profile
            .service(
                web::resource("/{id}/profile")
                    .route(web::get().to(employee::get_profile))
                    .route(web::put().to(employee::put_profile)),
            )
            // /employee/{id}/loans
            .service(
                web::resource("/{id}/loans")
                    .route(web::get().to(employee::list_loans))
                    .route(web::post().to(employee::add_loan)),
            )
            // /employee/{id}/bonuses
            .service(
                web::resource("/{id}/bonuses")
                    .route(web::get().to(employee::list_bonuses))
                    .route(web::post().to(employee::add_bonus)),
            ),
    );
}
