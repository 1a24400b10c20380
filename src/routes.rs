//! Declared route table: what each endpoint answers, documented the same way
//! it is served at `GET /routes`.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tag {
    Users,
    Tweets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteDoc {
    pub method: &'static str,
    pub path: &'static str,
    pub response: &'static str,
    pub status: u16,
    pub summary: &'static str,
    pub tag: Tag,
}

pub const SIGNUP: RouteDoc = RouteDoc {
    method: "POST",
    path: "/signup",
    response: "User",
    status: 201,
    summary: "Register a user",
    tag: Tag::Users,
};

pub const LOGIN: RouteDoc = RouteDoc {
    method: "POST",
    path: "/login",
    response: "User",
    status: 200,
    summary: "Login a user",
    tag: Tag::Users,
};

pub const LIST_USERS: RouteDoc = RouteDoc {
    method: "GET",
    path: "/users",
    response: "[User]",
    status: 200,
    summary: "Show all users",
    tag: Tag::Users,
};

pub const SHOW_USER: RouteDoc = RouteDoc {
    method: "GET",
    path: "/users/{user_id}",
    response: "User",
    status: 200,
    summary: "Show a user",
    tag: Tag::Users,
};

pub const UPDATE_USER: RouteDoc = RouteDoc {
    method: "PUT",
    path: "/users/{user_id}/update",
    response: "User",
    status: 200,
    summary: "Update a user",
    tag: Tag::Users,
};

pub const DELETE_USER: RouteDoc = RouteDoc {
    method: "DELETE",
    path: "/users/{user_id}/delete",
    response: "User",
    status: 200,
    summary: "Delete a user",
    tag: Tag::Users,
};

pub const HOME: RouteDoc = RouteDoc {
    method: "GET",
    path: "/",
    response: "[Tweet]",
    status: 200,
    summary: "Show all tweets",
    tag: Tag::Tweets,
};

pub const POST_TWEET: RouteDoc = RouteDoc {
    method: "POST",
    path: "/post",
    response: "Tweet",
    status: 201,
    summary: "Post a tweet",
    tag: Tag::Tweets,
};

pub const SHOW_TWEET: RouteDoc = RouteDoc {
    method: "GET",
    path: "/tweets/{tweet_id}",
    response: "Tweet",
    status: 200,
    summary: "Show a tweet",
    tag: Tag::Tweets,
};

pub const UPDATE_TWEET: RouteDoc = RouteDoc {
    method: "PUT",
    path: "/tweets/{tweet_id}/update",
    response: "Tweet",
    status: 200,
    summary: "Update a tweet",
    tag: Tag::Tweets,
};

pub const DELETE_TWEET: RouteDoc = RouteDoc {
    method: "DELETE",
    path: "/tweets/{tweet_id}/delete",
    response: "Tweet",
    status: 200,
    summary: "Delete a tweet",
    tag: Tag::Tweets,
};

pub const ROUTES: &[RouteDoc] = &[
    SIGNUP,
    LOGIN,
    LIST_USERS,
    SHOW_USER,
    UPDATE_USER,
    DELETE_USER,
    HOME,
    POST_TWEET,
    SHOW_TWEET,
    UPDATE_TWEET,
    DELETE_TWEET,
];
