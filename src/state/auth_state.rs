// ============================================================================
// AUTH STATE - Usuario actual (lo alimenta la página tras el login)
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

/// Usuario autenticado
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub uid: String,
    /// ID token para `Authorization: Bearer`; None con reglas abiertas / emulador
    pub id_token: Option<String>,
}

/// "Usuario actual o ninguno"
pub trait AuthProvider {
    fn current_user(&self) -> Option<AuthUser>;

    fn current_user_id(&self) -> Option<String> {
        self.current_user().map(|user| user.uid)
    }
}

/// Estado de autenticación
#[derive(Clone, Default)]
pub struct AuthState {
    user: Rc<RefCell<Option<AuthUser>>>,
}

impl AuthState {
    /// Crear nuevo estado de autenticación (sin usuario)
    pub fn new() -> Self {
        Self::default()
    }

    /// Estado ya autenticado
    pub fn signed_in(uid: impl Into<String>) -> Self {
        let state = Self::new();
        state.set_user(Some(AuthUser {
            uid: uid.into(),
            id_token: None,
        }));
        state
    }

    /// Establecer usuario
    pub fn set_user(&self, user: Option<AuthUser>) {
        *self.user.borrow_mut() = user;
    }

    /// Renovar solo el token (el SDK de auth lo refresca cada hora)
    pub fn set_token(&self, id_token: Option<String>) {
        if let Some(user) = self.user.borrow_mut().as_mut() {
            user.id_token = id_token;
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.borrow().is_some()
    }

    /// Logout - limpiar todo
    pub fn logout(&self) {
        self.set_user(None);
    }
}

impl AuthProvider for AuthState {
    fn current_user(&self) -> Option<AuthUser> {
        self.user.borrow().clone()
    }
}
