use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{AuditLogList, UserList},
        auth::{AccessTokenResponse, LoginRequest, LoginResponse, RefreshRequest, RegisterRequest},
        cart::{AddToCartRequest, CartItemDto, CartView, UpdateCartItemRequest},
        orders::{OrderList, OrderWithItems, PlaceOrderRequest, UpdateOrderStatusRequest},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        vendors::{VendorApplyRequest, VendorList, VendorStatusChange},
        wishlist::{
            AddWishlistRequest, UpdateWishlistItemRequest, WishlistImport, WishlistItemDto,
            WishlistView,
        },
    },
    models::{AuditLog, Category, Order, OrderItem, OrderStatus, Product, Role, User, Vendor, VendorStatus},
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, health, orders, params, products, vendors, wishlist},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        auth::register,
        auth::login,
        auth::refresh,
        auth::logout,
        auth::me,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::list_categories,
        cart::get_cart,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        orders::place_order,
        orders::list_orders,
        orders::get_order,
        orders::cancel_order,
        orders::update_order_status,
        wishlist::list_wishlist,
        wishlist::add_to_wishlist,
        wishlist::update_wishlist_item,
        wishlist::import_wishlist,
        wishlist::remove_from_wishlist,
        wishlist::clear_wishlist,
        vendors::apply,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::list_vendors,
        admin::get_vendor,
        admin::approve_vendor,
        admin::reject_vendor,
        admin::suspend_vendor,
        admin::list_users,
        admin::delete_user,
        admin::list_audit_logs
    ),
    components(
        schemas(
            User,
            Role,
            Vendor,
            VendorStatus,
            Category,
            Product,
            Order,
            OrderItem,
            OrderStatus,
            AuditLog,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            RefreshRequest,
            AccessTokenResponse,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartView,
            CartItemDto,
            PlaceOrderRequest,
            UpdateOrderStatusRequest,
            OrderList,
            OrderWithItems,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            AddWishlistRequest,
            WishlistItemDto,
            WishlistView,
            UpdateWishlistItemRequest,
            WishlistImport,
            VendorApplyRequest,
            VendorList,
            VendorStatusChange,
            UserList,
            AuditLogList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<VendorStatusChange>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Auth", description = "Registration, login and tokens"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order placement and tracking"),
        (name = "Wishlist", description = "Wishlist endpoints"),
        (name = "Vendors", description = "Vendor applications"),
        (name = "Admin", description = "Order oversight"),
        (name = "Super Admin", description = "Vendor review, users and audit log"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
