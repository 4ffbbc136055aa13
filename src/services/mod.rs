pub mod review_session;
