//! Static frontend pages and assets served from the configured directory.

use std::path::PathBuf;

use actix_files::{Files, NamedFile};
use actix_web::dev::{ServiceRequest, ServiceResponse, fn_service};
use actix_web::{HttpRequest, HttpResponse, web};
use cropguard_shared::ApiFailure;
use serde_json::json;

#[derive(Clone)]
struct FrontendDir(PathBuf);

/// What to answer when a page's file is absent.
#[derive(Clone, Copy)]
enum Fallback {
    NotFound,
    Placeholder(&'static str),
    RenderFailed,
}

#[derive(Clone, Copy)]
struct FrontendFile {
    path: &'static str,
    fallback: Fallback,
}

const fn page(path: &'static str) -> FrontendFile {
    FrontendFile {
        path,
        fallback: Fallback::RenderFailed,
    }
}

const fn asset(path: &'static str) -> FrontendFile {
    FrontendFile {
        path,
        fallback: Fallback::NotFound,
    }
}

const ROUTES: [(&str, FrontendFile); 11] = [
    ("/", page("index.html")),
    ("/about", page("about.html")),
    ("/guide", page("guide.html")),
    ("/upload", page("upload.html")),
    (
        "/login",
        FrontendFile {
            path: "login.html",
            fallback: Fallback::Placeholder("Login page not yet implemented"),
        },
    ),
    (
        "/profile",
        FrontendFile {
            path: "profile.html",
            fallback: Fallback::Placeholder("Profile page not yet implemented"),
        },
    ),
    ("/static/style.css", asset("styles/main.css")),
    ("/static/about.css", asset("styles/about.css")),
    ("/static/guide.css", asset("styles/guide.css")),
    ("/static/script.js", asset("scripts/script.js")),
    ("/static/sw.js", asset("scripts/sw.js")),
];

pub fn configure_pages(cfg: &mut web::ServiceConfig, frontend_dir: PathBuf) {
    for (route, file) in ROUTES {
        cfg.service(
            web::resource(route)
                .app_data(web::Data::new(file))
                .route(web::get().to(serve_file)),
        );
    }

    cfg.app_data(web::Data::new(FrontendDir(frontend_dir.clone())))
        .service(
            Files::new("/static/images", frontend_dir.join("images")).default_handler(
                fn_service(|req: ServiceRequest| async {
                    let (req, _) = req.into_parts();
                    let response = HttpResponse::NotFound().json(json!({"error": "Image not found"}));
                    Ok::<_, actix_web::Error>(ServiceResponse::new(req, response))
                }),
            ),
        );
}

async fn serve_file(
    req: HttpRequest,
    dir: web::Data<FrontendDir>,
    file: web::Data<FrontendFile>,
) -> HttpResponse {
    let path = dir.0.join(file.path);
    match NamedFile::open_async(&path).await {
        Ok(named) => named.into_response(&req),
        Err(e) => {
            log::warn!("Cannot serve {}: {}", path.display(), e);
            match file.fallback {
                Fallback::NotFound => HttpResponse::NotFound()
                    .json(ApiFailure::new("Resource not found").with_status(404)),
                Fallback::Placeholder(message) => HttpResponse::Ok().json(json!({ "message": message })),
                Fallback::RenderFailed => HttpResponse::InternalServerError()
                    .json(ApiFailure::new("Template rendering failed")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test};
    use std::fs;

    fn frontend() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<h1>CropGuard</h1>").unwrap();
        fs::create_dir(dir.path().join("styles")).unwrap();
        fs::write(dir.path().join("styles/main.css"), "body{}").unwrap();
        fs::create_dir(dir.path().join("images")).unwrap();
        fs::write(dir.path().join("images/leaf.png"), [0x89, b'P', b'N', b'G']).unwrap();
        dir
    }

    #[actix_web::test]
    async fn serves_pages_and_assets() {
        let dir = frontend();
        let root = dir.path().to_path_buf();
        let app = test::init_service(App::new().configure(|cfg| configure_pages(cfg, root.clone()))).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, "<h1>CropGuard</h1>");

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/static/style.css").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/static/images/leaf.png").to_request())
                .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn missing_files_fall_back() {
        let dir = frontend();
        let root = dir.path().to_path_buf();
        let app = test::init_service(App::new().configure(|cfg| configure_pages(cfg, root.clone()))).await;

        let req = test::TestRequest::get().uri("/login").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Login page not yet implemented");

        let resp = test::call_service(&app, test::TestRequest::get().uri("/about").to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/static/sw.js").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/static/images/missing.png").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Image not found");
    }
}
